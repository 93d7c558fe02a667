//! Reference data seeded on first start
//!
//! Only empty tables are filled, so restarting never duplicates rows or
//! overwrites operator edits.

use leadwell_common::models::{NewMarketingChannel, NewProjectType};
use leadwell_common::Result;
use tracing::info;

use crate::storage::Storage;

/// (name, description)
const PROJECT_TYPES: [(&str, &str); 4] = [
    ("Residential Renovation", "Home renovation projects"),
    ("Commercial Office", "Office building projects"),
    ("Industrial Facility", "Industrial and manufacturing facilities"),
    ("Residential New Build", "New home construction"),
];

/// (name, icon)
const MARKETING_CHANNELS: [(&str, &str); 5] = [
    ("Facebook", "ri-facebook-circle-fill"),
    ("Google", "ri-google-fill"),
    ("LinkedIn", "ri-linkedin-box-fill"),
    ("Website", "ri-global-line"),
    ("Referrals", "ri-contacts-line"),
];

/// Rows inserted by [`seed_reference_data`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub project_types: usize,
    pub marketing_channels: usize,
}

/// Fill the project-type and marketing-channel tables when they are empty
pub async fn seed_reference_data(storage: &dyn Storage) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    if storage.list_project_types().await?.is_empty() {
        for (name, description) in PROJECT_TYPES {
            storage
                .create_project_type(NewProjectType {
                    name: name.to_string(),
                    description: Some(description.to_string()),
                    min_budget: None,
                    average_timeline: None,
                })
                .await?;
            report.project_types += 1;
        }
    }

    if storage.list_marketing_channels().await?.is_empty() {
        for (name, icon) in MARKETING_CHANNELS {
            storage
                .create_marketing_channel(NewMarketingChannel {
                    name: name.to_string(),
                    icon: icon.to_string(),
                    active: true,
                    conversion_rate: None,
                })
                .await?;
            report.marketing_channels += 1;
        }
    }

    if report != SeedReport::default() {
        info!(
            project_types = report.project_types,
            marketing_channels = report.marketing_channels,
            "Seeded reference data"
        );
    }
    Ok(report)
}
