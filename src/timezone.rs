//! Current local time for a city
//!
//! The UTC offset for a city is resolved by walking a fixed priority order:
//!
//! 1. [`ResolutionStage::FixedZone`]: well-known names with a fixed offset.
//!    A match always rewrites the session cache, even when it already holds
//!    the same entry.
//! 2. [`ResolutionStage::SessionCache`]: the last city resolved in this
//!    session, compared case-insensitively.
//! 3. [`ResolutionStage::LiveLookup`]: a weather lookup, whose offset and
//!    normalized name then replace the cache.
//!
//! At most one weather call is made per distinct city per session.

use crate::clock::Clock;
use crate::error::ServiceError;
use crate::session::{keys, remember_zone, SessionState};
use crate::weather::WeatherProvider;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::sync::Arc;

/// A name that always maps to one offset
#[derive(Debug, Clone, Copy)]
pub struct FixedZone {
    /// Lowercase name matched against the request
    pub alias: &'static str,
    pub label: &'static str,
    pub offset_secs: i64,
}

pub const FIXED_ZONES: &[FixedZone] = &[FixedZone {
    alias: "india",
    label: "India (IST)",
    offset_secs: 19_800,
}];

/// Where an offset came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResolutionStage {
    #[serde(rename = "fixed")]
    FixedZone,
    #[serde(rename = "cached")]
    SessionCache,
    #[serde(rename = "live")]
    LiveLookup,
}

/// Stages in the order they are consulted
pub const RESOLUTION_ORDER: [ResolutionStage; 3] = [
    ResolutionStage::FixedZone,
    ResolutionStage::SessionCache,
    ResolutionStage::LiveLookup,
];

/// Offset and display name chosen for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedZone {
    pub city_name: String,
    pub offset_secs: i64,
    pub source: ResolutionStage,
}

/// Result of a successful time query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeReport {
    pub report: String,
    pub city_name: String,
    pub utc_offset: i64,
    pub local_time: String,
    pub source: ResolutionStage,
}

pub struct TimezoneResolver {
    weather: Arc<dyn WeatherProvider>,
    clock: Arc<dyn Clock>,
}

impl TimezoneResolver {
    pub fn new(weather: Arc<dyn WeatherProvider>, clock: Arc<dyn Clock>) -> Self {
        Self { weather, clock }
    }

    /// Current time in `city`, reusing or refreshing the session's timezone cache
    pub async fn resolve_current_time<S>(&self, state: &mut S, city: &str) -> Result<TimeReport, ServiceError>
    where
        S: SessionState + ?Sized,
    {
        let zone = self.resolve_zone(state, city).await?;
        tracing::info!(
            city = %city,
            resolved = %zone.city_name,
            offset_secs = zone.offset_secs,
            source = ?zone.source,
            "Resolved timezone"
        );
        format_time_report(self.clock.now(), &zone)
    }

    /// Walk [`RESOLUTION_ORDER`] until a stage produces an offset
    pub async fn resolve_zone<S>(&self, state: &mut S, city: &str) -> Result<ResolvedZone, ServiceError>
    where
        S: SessionState + ?Sized,
    {
        let wanted = city.to_lowercase();
        for stage in RESOLUTION_ORDER {
            let found = match stage {
                ResolutionStage::FixedZone => fixed_zone(state, &wanted),
                ResolutionStage::SessionCache => cached_zone(state, &wanted),
                ResolutionStage::LiveLookup => Some(self.live_zone(state, city).await?),
            };
            if let Some(zone) = found {
                return Ok(zone);
            }
        }
        // LiveLookup always answers or fails
        Err(ServiceError::provider(format!("No timezone found for '{city}'")))
    }

    async fn live_zone<S>(&self, state: &mut S, city: &str) -> Result<ResolvedZone, ServiceError>
    where
        S: SessionState + ?Sized,
    {
        let weather = self.weather.fetch_weather(city).await?;
        remember_zone(state, &weather.city_name, weather.timezone_offset);
        Ok(ResolvedZone {
            city_name: weather.city_name,
            offset_secs: weather.timezone_offset,
            source: ResolutionStage::LiveLookup,
        })
    }
}

fn fixed_zone<S>(state: &mut S, wanted: &str) -> Option<ResolvedZone>
where
    S: SessionState + ?Sized,
{
    let zone = FIXED_ZONES.iter().find(|z| z.alias == wanted)?;
    remember_zone(state, zone.label, zone.offset_secs);
    Some(ResolvedZone {
        city_name: zone.label.to_string(),
        offset_secs: zone.offset_secs,
        source: ResolutionStage::FixedZone,
    })
}

fn cached_zone<S>(state: &S, wanted: &str) -> Option<ResolvedZone>
where
    S: SessionState + ?Sized,
{
    let cached_city = state.get_str(keys::LAST_WEATHER_CITY)?;
    if cached_city.to_lowercase() != wanted {
        return None;
    }
    let offset_secs = state.get_i64(keys::LAST_WEATHER_TZ)?;
    Some(ResolvedZone {
        city_name: cached_city.to_string(),
        offset_secs,
        source: ResolutionStage::SessionCache,
    })
}

/// Format `now` shifted into `zone`
pub fn format_time_report(now: DateTime<Utc>, zone: &ResolvedZone) -> Result<TimeReport, ServiceError> {
    let offset = i32::try_from(zone.offset_secs)
        .ok()
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            ServiceError::parse(format!(
                "Error calculating time: offset {} seconds is out of range",
                zone.offset_secs
            ))
        })?;

    let local = now.with_timezone(&offset);
    let local_time = format!("{} {}", local.format("%Y-%m-%d %H:%M:%S"), offset_label(zone.offset_secs));
    Ok(TimeReport {
        report: format!("The current time in {} is {local_time}", zone.city_name),
        city_name: zone.city_name.clone(),
        utc_offset: zone.offset_secs,
        local_time,
        source: zone.source,
    })
}

/// `UTC` for a zero offset, otherwise `UTC±HH:MM` with `:SS` when needed
pub fn offset_label(offset_secs: i64) -> String {
    if offset_secs == 0 {
        return "UTC".to_string();
    }
    let sign = if offset_secs < 0 { '-' } else { '+' };
    let abs = offset_secs.unsigned_abs();
    let (hours, minutes, seconds) = (abs / 3600, (abs % 3600) / 60, abs % 60);
    if seconds == 0 {
        format!("UTC{sign}{hours:02}:{minutes:02}")
    } else {
        format!("UTC{sign}{hours:02}:{minutes:02}:{seconds:02}")
    }
}
