//! Temporal/spatial bucketing of incidents.
//!
//! Every incident and query maps to exactly one period key built from
//! weekday/weekend and a four-way time-of-day split. The mapping is total:
//! hours outside [0, 24) land in the night bucket via the catch-all arm,
//! matching the trained surfaces' segmentation exactly.

/// Weekday/weekend half of a period key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayKind {
    /// Monday through Friday.
    Weekday,
    /// Saturday and Sunday (`day_of_week >= 5`).
    Weekend,
}

impl DayKind {
    /// Derives the day kind from a 0 = Monday .. 6 = Sunday index.
    #[must_use]
    pub const fn from_day_of_week(day_of_week: u8) -> Self {
        if day_of_week >= 5 {
            Self::Weekend
        } else {
            Self::Weekday
        }
    }
}

impl std::fmt::Display for DayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weekday => write!(f, "weekday"),
            Self::Weekend => write!(f, "weekend"),
        }
    }
}

/// Time-of-day quarter of a period key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimePeriod {
    /// Hours [6, 12).
    Morning,
    /// Hours [12, 18).
    Afternoon,
    /// Hours [18, 24).
    Evening,
    /// Everything else, including out-of-range hours.
    Night,
}

impl TimePeriod {
    /// Maps an hour to its time period. Total: values outside [0, 24)
    /// fall through to [`Self::Night`].
    #[must_use]
    pub const fn from_hour(hour: u8) -> Self {
        match hour {
            6..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            18..=23 => Self::Evening,
            _ => Self::Night,
        }
    }

    /// All four periods in training order.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [Self::Morning, Self::Afternoon, Self::Evening, Self::Night]
    }
}

impl std::fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Morning => write!(f, "morning"),
            Self::Afternoon => write!(f, "afternoon"),
            Self::Evening => write!(f, "evening"),
            Self::Night => write!(f, "night"),
        }
    }
}

/// A fully qualified bucket key.
///
/// Renders as `weekday_morning`, optionally suffixed with
/// `_comuna_<id>` and `_barrio_<id>` zone qualifiers. The rendered string
/// is the lookup key into the surface map and the serialization key in
/// the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeriodKey {
    /// Weekday/weekend segment.
    pub day_kind: DayKind,
    /// Time-of-day segment.
    pub time_period: TimePeriod,
    /// Optional comuna qualifier.
    pub comuna: Option<u32>,
    /// Optional barrio qualifier.
    pub barrio: Option<u32>,
}

impl PeriodKey {
    /// Builds the key for an hour / day-of-week pair, deriving the
    /// weekend flag when not supplied.
    #[must_use]
    pub const fn new(hour: u8, day_of_week: u8, is_weekend: Option<bool>) -> Self {
        let day_kind = match is_weekend {
            Some(true) => DayKind::Weekend,
            Some(false) => DayKind::Weekday,
            None => DayKind::from_day_of_week(day_of_week),
        };

        Self {
            day_kind,
            time_period: TimePeriod::from_hour(hour),
            comuna: None,
            barrio: None,
        }
    }

    /// The eight unqualified training keys, weekday periods first.
    #[must_use]
    pub fn training_keys() -> Vec<Self> {
        let mut keys = Vec::with_capacity(8);
        for day_kind in [DayKind::Weekday, DayKind::Weekend] {
            for time_period in TimePeriod::all() {
                keys.push(Self {
                    day_kind,
                    time_period,
                    comuna: None,
                    barrio: None,
                });
            }
        }
        keys
    }

    /// Attaches zone qualifiers to the key.
    #[must_use]
    pub const fn with_zone(mut self, comuna: Option<u32>, barrio: Option<u32>) -> Self {
        self.comuna = comuna;
        self.barrio = barrio;
        self
    }
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.day_kind, self.time_period)?;
        if let Some(comuna) = self.comuna {
            write!(f, "_comuna_{comuna}")?;
        }
        if let Some(barrio) = self.barrio {
            write!(f, "_barrio_{barrio}")?;
        }
        Ok(())
    }
}
