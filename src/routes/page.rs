use rocket::request::FlashMessage;
use rocket::{Route, State};
use rocket_dyn_templates::{context, Template};

use crate::config::InvitationConfig;
use crate::countdown::Countdown;
use crate::greeting;
use crate::guestbook::{Guestbook, ATTENDANCE_PLACEHOLDER};
use crate::models::Attendance;

#[get("/?<to>&<name>")]
async fn index(
    to: Option<&str>,
    name: Option<&str>,
    flash: Option<FlashMessage<'_>>,
    config: &State<InvitationConfig>,
    countdown: &State<Countdown>,
    guestbook: &State<Guestbook>,
) -> Template {
    let flash = flash.map(|f| {
        context! {
            kind: f.kind().to_string(),
            message: f.message().to_string(),
        }
    });
    let guest = greeting::addressee(to, name, &config.default_addressee);
    let listed = guestbook.listing(None).await;
    let summary = guestbook.summary().await;

    let entries: Vec<_> = listed
        .iter()
        .map(|e| {
            context! {
                name: &e.name,
                message: &e.message,
                attendance: e.attendance.label(),
                submitted_at: e.submitted_at.format("%d %b %Y, %H:%M UTC").to_string(),
            }
        })
        .collect();
    let options: Vec<_> = Attendance::ALL
        .into_iter()
        .map(|a| context! { value: a.as_str(), label: a.label() })
        .collect();

    Template::render("index", context! {
        guest: guest,
        couple: &config.couple,
        event: &config.event,
        gifts: &config.gifts,
        countdown: countdown.remaining(),
        countdown_target: countdown.target().to_rfc3339(),
        entries: entries,
        summary: summary,
        options: options,
        placeholder: ATTENDANCE_PLACEHOLDER,
        flash: flash,
    })
}

pub fn routes() -> Vec<Route> {
    routes![index]
}
