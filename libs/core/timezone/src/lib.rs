// [libs/core/timezone/src/lib.rs]
/*!
 * =================================================================
 * APARATO: TIME-ZONE RESOLVER (V1.0)
 * CLASIFICACION: CORE DOMAIN SERVICE (ESTRATO L1)
 * RESPONSABILIDAD: RESOLUCION id -> ZONA, Y CONVERSIONES LOCAL<->UTC
 *
 * Contrato: resolve(id) intenta lookup directo (IANA en
 * POSIX, IDs de Windows en Windows), luego traduce IANA->Windows y
 * reintenta, y finalmente cae a UTC registrando una advertencia. Este
 * crate nunca falla: siempre devuelve una Zone utilizable.
 * =================================================================
 */

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{instrument, warn};

/// A resolved zone, remembering the identifier it was requested under so
/// callers can log/display the original string even after falling back.
#[derive(Debug, Clone)]
pub struct Zone {
    pub requested_id: String,
    pub tz: Tz,
    /// True if resolution had to fall back to UTC.
    pub fell_back: bool,
}

impl Zone {
    pub fn utc_fallback(requested_id: &str) -> Self {
        Self {
            requested_id: requested_id.to_string(),
            tz: chrono_tz::UTC,
            fell_back: true,
        }
    }
}

/// Capability surface so the scheduler/alert evaluator can be tested
/// against a fixed zone table without touching the real chrono-tz data.
pub trait TimeZoneResolver: Send + Sync {
    fn resolve(&self, id: &str) -> Zone;
}

/// Curated subset of the CLDR `windowsZones.xml` mapping: common Windows
/// zone display names to their IANA "golden" equivalent. Not exhaustive —
/// extend as real instance configurations surface unmapped IDs.
const WINDOWS_TO_IANA: &[(&str, &str)] = &[
    ("UTC", "Etc/UTC"),
    ("GMT Standard Time", "Europe/London"),
    ("W. Europe Standard Time", "Europe/Berlin"),
    ("Central Europe Standard Time", "Europe/Budapest"),
    ("Romance Standard Time", "Europe/Paris"),
    ("Central European Standard Time", "Europe/Warsaw"),
    ("E. Europe Standard Time", "Europe/Bucharest"),
    ("Eastern Standard Time", "America/New_York"),
    ("Central Standard Time", "America/Chicago"),
    ("Mountain Standard Time", "America/Denver"),
    ("Pacific Standard Time", "America/Los_Angeles"),
    ("SA Eastern Standard Time", "America/Sao_Paulo"),
    ("India Standard Time", "Asia/Kolkata"),
    ("China Standard Time", "Asia/Shanghai"),
    ("Tokyo Standard Time", "Asia/Tokyo"),
    ("AUS Eastern Standard Time", "Australia/Sydney"),
    ("Singapore Standard Time", "Asia/Singapore"),
    ("Arabian Standard Time", "Asia/Dubai"),
    ("Russian Standard Time", "Europe/Moscow"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeZoneResolver;

impl TimeZoneResolver for SystemTimeZoneResolver {
    #[instrument(skip(self))]
    fn resolve(&self, id: &str) -> Zone {
        if let Ok(tz) = id.parse::<Tz>() {
            return Zone {
                requested_id: id.to_string(),
                tz,
                fell_back: false,
            };
        }

        if let Some((_, iana)) = WINDOWS_TO_IANA.iter().find(|(win, _)| *win == id) {
            if let Ok(tz) = iana.parse::<Tz>() {
                return Zone {
                    requested_id: id.to_string(),
                    tz,
                    fell_back: false,
                };
            }
        }

        warn!(zone_id = id, "unresolvable time zone, falling back to UTC");
        Zone::utc_fallback(id)
    }
}

/// Converts a UTC instant to the given zone's wall clock.
pub fn to_local(utc_instant: DateTime<Utc>, zone: &Zone) -> DateTime<Tz> {
    utc_instant.with_timezone(&zone.tz)
}

/// Converts an unspecified-kind wall-clock time in `zone` to UTC.
///
/// Ambiguous times (DST fold) resolve to the earlier offset; nonexistent
/// times (DST spring-forward gap) resolve to the later valid instant.
/// Both choices are conservative: they never invent an instant the wall
/// clock could not plausibly have meant.
pub fn to_utc(local_wall_clock: NaiveDateTime, zone: &Zone) -> DateTime<Utc> {
    match zone.tz.from_local_datetime(&local_wall_clock) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, _later) => earlier.with_timezone(&Utc),
        LocalResult::None => {
            // Walk forward minute by minute until we land in a valid offset.
            let mut probe = local_wall_clock + chrono::Duration::minutes(1);
            loop {
                if let LocalResult::Single(dt) = zone.tz.from_local_datetime(&probe) {
                    return dt.with_timezone(&Utc);
                }
                probe += chrono::Duration::minutes(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn resolves_iana_id_directly() {
        let zone = SystemTimeZoneResolver.resolve("Europe/Madrid");
        assert!(!zone.fell_back);
        assert_eq!(zone.tz, chrono_tz::Europe::Madrid);
    }

    #[test]
    fn resolves_windows_id_via_mapping() {
        let zone = SystemTimeZoneResolver.resolve("Central European Standard Time");
        assert!(!zone.fell_back);
        assert_eq!(zone.tz, chrono_tz::Europe::Warsaw);
    }

    #[test]
    fn unknown_id_falls_back_to_utc() {
        let zone = SystemTimeZoneResolver.resolve("Nonexistent/Zone");
        assert!(zone.fell_back);
        assert_eq!(zone.tz, chrono_tz::UTC);
    }

    #[test]
    fn round_trips_local_to_utc_and_back() {
        let zone = SystemTimeZoneResolver.resolve("America/New_York");
        let local = NaiveDate::from_ymd_opt(2026, 6, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let utc = to_utc(local, &zone);
        let back = to_local(utc, &zone);
        assert_eq!(back.naive_local(), local);
    }
}
