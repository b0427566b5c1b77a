use std::net::IpAddr;

use rocket::form::Form;
use rocket::response::status::Created;
use rocket::response::stream::{Event, EventStream};
use rocket::response::{Flash, Redirect};
use rocket::serde::json::Json;
use rocket::tokio::select;
use rocket::{Route, Shutdown, State};
use rocket_db_pools::Connection;

use crate::config::InvitationConfig;
use crate::error::GuestbookError;
use crate::guestbook::Guestbook;
use crate::models::{AttendanceSummary, GuestEntry, GuestForm};
use crate::throttle::{self, Redis};

const THANK_YOU: &str = "Terima kasih atas ucapan dan doanya!";

async fn accept(
    form: &GuestForm,
    guestbook: &Guestbook,
    config: &InvitationConfig,
    redis: Option<Connection<Redis>>,
    client_ip: Option<IpAddr>,
) -> Result<GuestEntry, GuestbookError> {
    let client = throttle::client_key(client_ip);
    if let Some(mut r) = redis {
        if !throttle::allow_submission(&mut r, &client, config.guestbook.throttle).await {
            return Err(GuestbookError::Throttled);
        }
    }
    guestbook.submit(&client, form).await
}

#[get("/guestbook")]
fn guestbook_redir() -> Redirect {
    Redirect::to("/#guestbook")
}

#[post("/guestbook", data = "<form>")]
async fn submit_form(
    form: Form<GuestForm>,
    guestbook: &State<Guestbook>,
    config: &State<InvitationConfig>,
    redis: Option<Connection<Redis>>,
    client_ip: Option<IpAddr>,
) -> Flash<Redirect> {
    let back = Redirect::to("/#guestbook");
    match accept(&form, guestbook, config, redis, client_ip).await {
        Ok(_) => Flash::success(back, THANK_YOU),
        Err(e) => Flash::error(back, e.to_string()),
    }
}

#[post("/api/guestbook", format = "json", data = "<form>")]
async fn submit_json(
    form: Json<GuestForm>,
    guestbook: &State<Guestbook>,
    config: &State<InvitationConfig>,
    redis: Option<Connection<Redis>>,
    client_ip: Option<IpAddr>,
) -> Result<Created<Json<GuestEntry>>, GuestbookError> {
    let entry = accept(&form, guestbook, config, redis, client_ip).await?;
    Ok(Created::new("/api/guestbook").body(Json(entry)))
}

#[get("/api/guestbook?<limit>")]
async fn list(limit: Option<usize>, guestbook: &State<Guestbook>) -> Json<Vec<GuestEntry>> {
    Json(guestbook.listing(limit).await)
}

#[get("/api/guestbook/summary")]
async fn summary(guestbook: &State<Guestbook>) -> Json<AttendanceSummary> {
    Json(guestbook.summary().await)
}

/// Sends the current list, then the whole list again after every change.
#[get("/api/guestbook/live")]
fn live(guestbook: &State<Guestbook>, mut end: Shutdown) -> EventStream![] {
    let mut rx = guestbook.watch();
    EventStream! {
        let entries = rx.borrow_and_update().clone();
        yield Event::json(&entries).event("entries");

        loop {
            select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                },
                _ = &mut end => break,
            };

            let entries = rx.borrow_and_update().clone();
            yield Event::json(&entries).event("entries");
        }
    }
}

pub fn routes() -> Vec<Route> {
    routes![guestbook_redir, submit_form, submit_json, list, summary, live]
}
