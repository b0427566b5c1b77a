pub mod countdown;
pub mod guestbook;
pub mod page;
