//! Command output in text or JSON

use std::net::IpAddr;

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

use deploy_ipam_core::{NetworkReservation, ReservationState, ReservationType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Plain-text rendering of a command result
pub trait Render {
    fn render_text(&self) -> String;
}

pub fn render<T: Serialize + Render>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(value.render_text()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
    }
}

/// Outcome of a reserve, release or reconcile
#[derive(Debug, Clone, Serialize)]
pub struct ReservationReport {
    pub network: String,
    pub instance: String,
    pub ip: Option<IpAddr>,
    #[serde(rename = "type")]
    pub reservation_type: Option<ReservationType>,
    pub state: ReservationState,
}

impl From<&NetworkReservation> for ReservationReport {
    fn from(reservation: &NetworkReservation) -> Self {
        Self {
            network: reservation.network().name().to_string(),
            instance: reservation.instance().id.to_string(),
            ip: reservation.ip(),
            reservation_type: reservation.reservation_type(),
            state: reservation.state(),
        }
    }
}

impl Render for ReservationReport {
    fn render_text(&self) -> String {
        let ip = self
            .ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "-".to_string());
        let kind = self
            .reservation_type
            .map(|kind| kind.to_string())
            .unwrap_or_else(|| "untyped".to_string());
        let state = match self.state {
            ReservationState::Reserved => "reserved",
            ReservationState::Released => "released",
            ReservationState::Resolved | ReservationState::Unresolved => "not reserved",
        };
        format!(
            "{} {} ({}) for instance '{}' on network '{}'",
            state, ip, kind, self.instance, self.network
        )
    }
}
