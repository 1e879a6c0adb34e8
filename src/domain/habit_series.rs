use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_ACTIONS: usize = 3;
pub const MAX_ACTIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Moderate,
    Challenging,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Easy,
        Difficulty::Moderate,
        Difficulty::Challenging,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Moderate => "moderate",
            Self::Challenging => "challenging",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|difficulty| difficulty.label().eq_ignore_ascii_case(label))
    }

    /// Labels joined with `", "`, in declaration order.
    pub fn labels() -> String {
        Self::ALL
            .iter()
            .map(|difficulty| difficulty.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitAction {
    pub name: String,
    pub description: String,
    pub difficulty: Difficulty,
}

/// Normalization output that passed every structural check.
///
/// Only the output validator constructs this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedArtifact {
    title: String,
    description: String,
    actions: Vec<HabitAction>,
}

impl ValidatedArtifact {
    pub(crate) fn new(title: String, description: String, actions: Vec<HabitAction>) -> Self {
        Self {
            title,
            description,
            actions,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn actions(&self) -> &[HabitAction] {
        &self.actions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Bronze,
    Silver,
    Gold,
    Diamond,
}

impl Rank {
    pub fn for_score(total_score: u32) -> Self {
        match total_score {
            0..100 => Self::Bronze,
            100..300 => Self::Silver,
            300..700 => Self::Gold,
            _ => Self::Diamond,
        }
    }
}

/// Content of a habit series that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitSeriesDraft {
    title: String,
    description: String,
    actions: Vec<HabitAction>,
}

impl HabitSeriesDraft {
    /// The only way to turn AI output into domain content.
    pub fn from_validated(artifact: ValidatedArtifact) -> Self {
        Self {
            title: artifact.title,
            description: artifact.description,
            actions: artifact.actions,
        }
    }
}

/// Stored shape of a habit series, used to rehydrate the entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitSeriesRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub actions: Vec<HabitAction>,
    pub total_score: u32,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitSeries {
    id: String,
    user_id: String,
    title: String,
    description: String,
    actions: Vec<HabitAction>,
    total_score: u32,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}

impl HabitSeries {
    pub fn create(
        id: impl Into<String>,
        user_id: impl Into<String>,
        draft: HabitSeriesDraft,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            title: draft.title,
            description: draft.description,
            actions: draft.actions,
            total_score: 0,
            created_at: now,
            last_activity_at: now,
        }
    }

    pub fn rehydrate(record: HabitSeriesRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            title: record.title,
            description: record.description,
            actions: record.actions,
            total_score: record.total_score,
            created_at: record.created_at,
            last_activity_at: record.last_activity_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn rank(&self) -> Rank {
        Rank::for_score(self.total_score)
    }

    pub fn to_record(&self) -> HabitSeriesRecord {
        HabitSeriesRecord {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            actions: self.actions.clone(),
            total_score: self.total_score,
            created_at: self.created_at,
            last_activity_at: self.last_activity_at,
        }
    }

    pub fn to_dto(&self) -> HabitSeriesDto {
        HabitSeriesDto {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            actions: self.actions.clone(),
            rank: self.rank(),
            total_score: self.total_score,
            created_at: self.created_at,
            last_activity_at: self.last_activity_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitSeriesDto {
    pub id: String,
    pub title: String,
    pub description: String,
    pub actions: Vec<HabitAction>,
    pub rank: Rank,
    pub total_score: u32,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}
