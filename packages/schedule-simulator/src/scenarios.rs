//! scenarios.rs — Tournament-day situations for the schedule simulator
//!
//! Each preset reshapes the configured roster or court pool to push the
//! scheduler into a specific corner: more pairs than courts, an odd team
//! out, or courts pulled for maintenance halfway through the day.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    /// Config as written
    Balanced,
    /// Half the courts are withheld, so most pairs queue
    CourtShortage,
    /// One extra team, leaving a leftover every round
    OddRoster,
    /// Courts go to maintenance after the first round
    MaintenanceWindow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub kind: ScenarioType,
    /// Available courts removed from the pool before round 1
    pub courts_withheld: u32,
    /// Teams added on top of the configured roster
    pub extra_teams: u32,
    /// Round after which `maintenance_courts` free courts are pulled
    pub maintenance_after_round: Option<u32>,
    pub maintenance_courts: u32,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            kind: ScenarioType::Balanced,
            courts_withheld: 0,
            extra_teams: 0,
            maintenance_after_round: None,
            maintenance_courts: 0,
        }
    }
}

impl ScenarioConfig {
    pub fn for_type(kind: ScenarioType, available_courts: u32) -> Self {
        match kind {
            ScenarioType::Balanced => Self::default(),
            ScenarioType::CourtShortage => preset_court_shortage(available_courts),
            ScenarioType::OddRoster => preset_odd_roster(),
            ScenarioType::MaintenanceWindow => preset_maintenance_window(available_courts),
        }
    }

    pub fn roster_size(&self, configured: u32) -> u32 {
        configured + self.extra_teams
    }

    /// Never withholds the last court.
    pub fn court_pool(&self, configured: u32) -> u32 {
        configured.saturating_sub(self.courts_withheld).max(configured.min(1))
    }

    pub fn pulls_courts_after(&self, round: u32) -> bool {
        self.maintenance_after_round == Some(round) && self.maintenance_courts > 0
    }
}

pub fn preset_court_shortage(available_courts: u32) -> ScenarioConfig {
    ScenarioConfig {
        kind: ScenarioType::CourtShortage,
        courts_withheld: available_courts / 2,
        ..Default::default()
    }
}

pub fn preset_odd_roster() -> ScenarioConfig {
    ScenarioConfig {
        kind: ScenarioType::OddRoster,
        extra_teams: 1,
        ..Default::default()
    }
}

pub fn preset_maintenance_window(available_courts: u32) -> ScenarioConfig {
    ScenarioConfig {
        kind: ScenarioType::MaintenanceWindow,
        maintenance_after_round: Some(1),
        maintenance_courts: (available_courts / 2).max(1),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn court_shortage_halves_the_pool_but_keeps_one() {
        assert_eq!(preset_court_shortage(4).court_pool(4), 2);
        assert_eq!(preset_court_shortage(1).court_pool(1), 1);
        assert_eq!(ScenarioConfig::default().court_pool(0), 0);
    }

    #[test]
    fn odd_roster_adds_a_single_team() {
        let sc = ScenarioConfig::for_type(ScenarioType::OddRoster, 4);
        assert_eq!(sc.roster_size(12), 13);
    }

    #[test]
    fn maintenance_window_triggers_after_round_one_only() {
        let sc = ScenarioConfig::for_type(ScenarioType::MaintenanceWindow, 4);
        assert!(sc.pulls_courts_after(1));
        assert!(!sc.pulls_courts_after(2));
        assert_eq!(sc.maintenance_courts, 2);
    }
}
