//! List command

use anyhow::{Context, Result};
use serde::Serialize;

use deploy_ipam_repos::{DatabaseIpRepo, IpAddressRecord};
use deploy_ipam_types::RepositoryBackend;

use crate::context::CliContext;
use crate::output::Render;

#[derive(Debug, Serialize)]
pub struct RecordList {
    pub records: Vec<IpAddressRecord>,
}

impl Render for RecordList {
    fn render_text(&self) -> String {
        if self.records.is_empty() {
            return "No reserved IPs".to_string();
        }

        let mut out = format!(
            "{:<40} {:<24} {:<24} {:<16} {}\n",
            "IP", "Scope", "Instance", "Deployment", "Reserved at"
        );
        out.push_str(&"-".repeat(120));
        for record in &self.records {
            out.push_str(&format!(
                "\n{:<40} {:<24} {:<24} {:<16} {}",
                record.address.to_string(),
                record.scope.to_string(),
                record.instance.as_str(),
                record.deployment.as_deref().unwrap_or("-"),
                record.reserved_at.format("%Y-%m-%d %H:%M:%S")
            ));
        }
        out
    }
}

/// List command implementation
pub struct ListCommand<'a> {
    context: &'a CliContext,
}

impl<'a> ListCommand<'a> {
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    pub fn execute(&self, instance: Option<&str>) -> Result<RecordList> {
        let settings = self.context.settings();
        if settings.effective_backend() != RepositoryBackend::Database {
            anyhow::bail!("Listing reservations requires the database backend");
        }

        let repo = DatabaseIpRepo::open(&settings.state_dir).with_context(|| {
            format!("Failed to open reservation table in {}", settings.state_dir.display())
        })?;
        let records = repo
            .records()
            .context("Failed to read reservation table")?
            .into_iter()
            .filter(|record| instance.map_or(true, |id| record.instance.as_str() == id))
            .collect();

        Ok(RecordList { records })
    }
}
