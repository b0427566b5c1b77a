use std::net::IpAddr;

use rocket_db_pools::deadpool_redis::redis;
use rocket_db_pools::{deadpool_redis, Connection, Database};
use tracing::{debug, warn};

use crate::config::ThrottleConfig;

#[derive(Database)]
#[database("redis")]
pub struct Redis(deadpool_redis::Pool);

/// Key identifying a client: the IPv4 address, or the /64 prefix for IPv6.
pub fn client_key(client_ip: Option<IpAddr>) -> String {
    match client_ip {
        Some(IpAddr::V4(ip4)) => ip4.to_string(),
        Some(IpAddr::V6(ip6)) => {
            let seg = ip6.segments();
            format!("{:04x}:{:04x}:{:04x}:{:04x}::/64", seg[0], seg[1], seg[2], seg[3])
        }
        None => String::from("unknown"),
    }
}

/// INCR and the first-hit EXPIRE in one MULTI/EXEC. `NX` leaves a running
/// window alone, so only the first submission of a window starts the clock.
fn counter_pipeline(key: &str, window_secs: i64) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .incr(key, 1)
        .cmd("EXPIRE")
        .arg(key)
        .arg(window_secs)
        .arg("NX")
        .ignore();
    pipe
}

/// Counts a guestbook submission for `client` and reports whether it is
/// still within the allowed window. Redis failures let the request through.
pub async fn allow_submission(
    r: &mut Connection<Redis>,
    client: &str,
    limits: ThrottleConfig,
) -> bool {
    let key = format!("guestbook:{client}");

    let counted: Result<(i64,), _> = counter_pipeline(&key, limits.window_secs)
        .query_async(&mut **r)
        .await;
    let count = match counted {
        Ok((count,)) => count,
        Err(e) => {
            warn!(error = %e, "submission counter unavailable");
            return true;
        }
    };

    debug!(client, count, "guestbook submission counted");
    count <= limits.max_submissions
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn ipv4_key_is_the_address() {
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7));
        assert_eq!(client_key(Some(ip)), "10.0.0.7");
    }

    #[test]
    fn ipv6_key_groups_by_prefix() {
        let a = IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 1, 2, 3, 4, 5, 6));
        let b = IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 1, 2, 9, 9, 9, 9));
        assert_eq!(client_key(Some(a)), "2001:0db8:0001:0002::/64");
        assert_eq!(client_key(Some(a)), client_key(Some(b)));
    }

    #[test]
    fn counter_and_window_are_one_transaction() {
        let packed = counter_pipeline("guestbook:10.0.0.7", 86400).get_packed_pipeline();
        let packed = String::from_utf8_lossy(&packed);

        let multi = packed.find("MULTI").unwrap();
        let incr = packed.find("INCR").unwrap();
        let expire = packed.find("EXPIRE").unwrap();
        let exec = packed.find("EXEC").unwrap();
        assert!(multi < incr && incr < expire && expire < exec);
        assert!(packed.contains("86400"));
        assert!(packed.contains("NX"));
    }

    #[test]
    fn missing_ip_has_a_key() {
        assert_eq!(client_key(None), "unknown");
    }
}
