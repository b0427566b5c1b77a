#[macro_use] extern crate rocket;

use std::sync::Arc;

use rocket::fairing::{self, AdHoc};
use rocket::figment::Figment;
use rocket::{Build, Rocket};
use rocket_db_pools::Database;
use rocket_dyn_templates::Template;
use tracing::{error, info, warn};

use collection::{MemoryCollection, MysqlCollection, RemoteCollection};
use config::{Backend, InvitationConfig, ListingStrategy};
use countdown::Countdown;
use guestbook::Guestbook;
use notify::Notifier;

pub mod collection;
pub mod config;
pub mod countdown;
pub mod error;
pub mod greeting;
pub mod guestbook;
pub mod logging;
pub mod models;
pub mod notify;
pub mod routes;
pub mod schema;
pub mod throttle;


async fn ignite_invitation(rocket: Rocket<Build>) -> fairing::Result {
    let config = match InvitationConfig::from_figment(rocket.figment()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid invitation configuration");
            return Err(rocket);
        }
    };

    let collection: Arc<dyn RemoteCollection> = match config.guestbook.backend {
        Backend::Memory => Arc::new(MemoryCollection::new()),
        Backend::Mysql => match collection::mysql::Db::fetch(&rocket) {
            Some(db) => Arc::new(MysqlCollection::new(db.pool())),
            None => {
                error!("guestbook database is not attached");
                return Err(rocket);
            }
        },
    };

    let mut guestbook = Guestbook::new(collection, config.guestbook.clone());
    if let Some(notify) = config.notify.clone() {
        guestbook = guestbook.with_notifier(Notifier::new(notify));
    }

    info!(
        backend = ?config.guestbook.backend,
        listing = ?config.guestbook.listing,
        target = %config.countdown_target,
        "invitation ready"
    );
    Ok(rocket
        .manage(Countdown::new(config.countdown_target))
        .manage(guestbook)
        .manage(config))
}

fn assemble(figment: Figment) -> Rocket<Build> {
    let backend = figment
        .extract_inner::<Backend>("invitation.guestbook.backend")
        .unwrap_or_default();
    let with_redis = figment.find_value("databases.redis").is_ok();

    let mut rocket = rocket::custom(figment).attach(Template::fairing());
    if backend == Backend::Mysql {
        rocket = rocket.attach(collection::mysql::Db::init());
    }
    if with_redis {
        rocket = rocket.attach(throttle::Redis::init());
    }

    rocket
        .attach(AdHoc::try_on_ignite("Invitation", ignite_invitation))
        .attach(AdHoc::on_liftoff("Guestbook listing", |rocket| {
            Box::pin(async move {
                let Some(guestbook) = rocket.state::<Guestbook>().cloned() else {
                    return;
                };
                match guestbook.settings().listing {
                    ListingStrategy::Live => {
                        tokio::spawn(guestbook.run_listener(rocket.shutdown()));
                    }
                    ListingStrategy::OneShot => {
                        tokio::spawn(async move {
                            if let Err(e) = guestbook.refresh().await {
                                warn!(error = %e, "initial guestbook load failed");
                            }
                        });
                    }
                }
            })
        }))
        .mount("/", routes::page::routes())
        .mount("/", routes::guestbook::routes())
        .mount("/", routes::countdown::routes())
}

#[launch]
fn rocket() -> _ {
    let figment = rocket::Config::figment();
    let filter = figment.extract_inner::<String>("invitation.log_filter").ok();
    logging::init(filter.as_deref());
    assemble(figment)
}
