use tracing::debug;

use crate::app::SelectMode;
use crate::error::PickerError;
use crate::model::StoredSecret;
use crate::picker::{PickOutcome, Picker};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    NoSecrets,
    NoMatches,
    Cancelled,
    Chosen {
        secrets: Vec<StoredSecret>,
        auto: bool,
    },
}

/// Case-insensitive substring match on the key; an empty filter keeps all.
pub fn filter_by_key(secrets: Vec<StoredSecret>, filter: &str) -> Vec<StoredSecret> {
    if filter.is_empty() {
        return secrets;
    }
    let needle = filter.to_lowercase();
    secrets
        .into_iter()
        .filter(|secret| secret.key.to_lowercase().contains(&needle))
        .collect()
}

pub async fn select(
    secrets: Vec<StoredSecret>,
    filter: &str,
    mode: SelectMode,
    picker: &mut dyn Picker,
) -> Result<Selection, PickerError> {
    if secrets.is_empty() {
        return Ok(Selection::NoSecrets);
    }

    let mut candidates = filter_by_key(secrets, filter);
    debug!("{} secrets match filter '{filter}'", candidates.len());
    if candidates.is_empty() {
        return Ok(Selection::NoMatches);
    }

    if mode == SelectMode::Single && candidates.len() == 1 {
        return Ok(Selection::Chosen {
            secrets: candidates,
            auto: true,
        });
    }

    match picker.pick(&candidates, mode).await? {
        PickOutcome::Cancelled => Ok(Selection::Cancelled),
        PickOutcome::Selected(indices) => {
            let mut chosen = Vec::with_capacity(indices.len());
            for index in indices {
                if index < candidates.len() {
                    chosen.push(std::mem::take(&mut candidates[index]));
                }
            }
            Ok(Selection::Chosen {
                secrets: chosen,
                auto: false,
            })
        }
    }
}

#[cfg(test)]
pub mod scripted {
    use super::*;
    use async_trait::async_trait;

    pub struct ScriptedPicker {
        outcome: PickOutcome,
        pub shown: Option<(Vec<String>, SelectMode)>,
    }

    impl ScriptedPicker {
        pub fn returning(outcome: PickOutcome) -> Self {
            Self {
                outcome,
                shown: None,
            }
        }
    }

    #[async_trait(?Send)]
    impl Picker for ScriptedPicker {
        async fn pick(
            &mut self,
            secrets: &[StoredSecret],
            mode: SelectMode,
        ) -> Result<PickOutcome, PickerError> {
            self.shown = Some((secrets.iter().map(|s| s.key.clone()).collect(), mode));
            Ok(self.outcome.clone())
        }
    }
}
