use std::time::Duration;

use rocket::response::stream::{Event, EventStream};
use rocket::serde::json::Json;
use rocket::tokio::select;
use rocket::tokio::time::interval;
use rocket::{Route, Shutdown, State};

use crate::countdown::{Countdown, CountdownState};

#[get("/api/countdown")]
fn current(countdown: &State<Countdown>) -> Json<CountdownState> {
    Json(countdown.remaining())
}

/// Ticks once a second until the ceremony starts, then sends the final
/// all-zero state and closes.
#[get("/api/countdown/stream")]
fn stream(countdown: &State<Countdown>, mut end: Shutdown) -> EventStream![] {
    let countdown = *countdown.inner();
    EventStream! {
        let mut timer = interval(Duration::from_secs(1));
        loop {
            select! {
                _ = timer.tick() => {},
                _ = &mut end => break,
            };

            let state = countdown.remaining();
            yield Event::json(&state).event("tick");
            if state.is_zero() {
                break;
            }
        }
    }
}

pub fn routes() -> Vec<Route> {
    routes![current, stream]
}
