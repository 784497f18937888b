//! Culture point requirements.
//!
//! Founding village `n` requires a fixed amount of accumulated culture
//! points. Small counts come from a table; beyond the table the last entry
//! grows geometrically per village.

use outpost_types::CulturePointState;
use tracing::debug;

use crate::client::GameClient;
use crate::config::CultureConfig;
use crate::error::CoreError;
use crate::fetch::PageFetcher;

/// Culture point curve for one server.
#[derive(Debug, Clone, PartialEq)]
pub struct CultureModel {
    requirements: Vec<u64>,
    growth_rate: f64,
}

impl CultureModel {
    /// Build the model from configuration.
    pub fn new(config: &CultureConfig) -> Self {
        Self {
            requirements: config.requirements.clone(),
            growth_rate: config.growth_rate.max(1.0),
        }
    }

    /// Points required to found the next village when `owned` villages
    /// already exist.
    ///
    /// Never decreases as `owned` grows. Saturates at `u64::MAX`.
    pub fn required_for_next(&self, owned: u32) -> u64 {
        let next = owned.saturating_add(1);
        let table_len = u32::try_from(self.requirements.len()).unwrap_or(u32::MAX);
        if next <= table_len {
            let index = usize::try_from(next.saturating_sub(1)).unwrap_or(usize::MAX);
            return self.requirements.get(index).copied().unwrap_or(u64::MAX);
        }

        let base = self.requirements.last().copied().unwrap_or(0);
        let beyond = i32::try_from(next.saturating_sub(table_len)).unwrap_or(i32::MAX);
        extrapolate(base, self.growth_rate, beyond)
    }

    /// Read the account's culture points and owned village count.
    ///
    /// One page read in the common case. The profile table is consulted
    /// only when the statistics page has no village switcher (accounts with
    /// a single village).
    pub async fn current_state<F: PageFetcher>(
        &self,
        client: &GameClient<F>,
    ) -> Result<CulturePointState, CoreError> {
        let overview = client.culture_overview().await?;
        let villages = if overview.villages > 0 {
            overview.villages
        } else {
            client.villages().await?.len().max(1)
        };
        let state = CulturePointState {
            current: overview.points,
            owned: u32::try_from(villages).unwrap_or(u32::MAX),
        };
        debug!(
            current = state.current,
            owned = state.owned,
            "culture point state"
        );
        Ok(state)
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn extrapolate(base: u64, growth_rate: f64, exponent: i32) -> u64 {
    let value = (base as f64 * growth_rate.powi(exponent)).round();
    if !value.is_finite() || value >= u64::MAX as f64 {
        u64::MAX
    } else {
        (value as u64).max(base)
    }
}
