use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Competitive tier ("division group") a school belongs to.
///
/// Tiers form an ordered ladder: `NonD1 < NonP4D1 < Power4D1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "Non-D1")]
    NonD1,
    #[serde(rename = "Non-P4 D1")]
    NonP4D1,
    #[serde(rename = "Power 4 D1")]
    Power4D1,
}

impl Tier {
    /// All tiers, bottom of the ladder first
    pub const ALL: [Tier; 3] = [Tier::NonD1, Tier::NonP4D1, Tier::Power4D1];

    /// Name of the tier as stored in the catalog's `division_group` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::NonD1 => "Non-D1",
            Tier::NonP4D1 => "Non-P4 D1",
            Tier::Power4D1 => "Power 4 D1",
        }
    }

    /// Adjacent tiers on the ladder. Only the middle tier has two.
    pub fn neighbours(&self) -> &'static [Tier] {
        match self {
            Tier::NonD1 => &[Tier::NonP4D1],
            Tier::NonP4D1 => &[Tier::Power4D1, Tier::NonD1],
            Tier::Power4D1 => &[Tier::NonP4D1],
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Non-D1" => Ok(Tier::NonD1),
            "Non-P4 D1" => Ok(Tier::NonP4D1),
            "Power 4 D1" => Ok(Tier::Power4D1),
            other => Err(format!("unknown division group '{}'", other)),
        }
    }
}

/// Letter grade on the catalog's `A+` .. `F` scale.
///
/// Variants are declared lowest first so the derived ordering matches
/// the ordinal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Grade {
    F,
    DMinus,
    D,
    DPlus,
    CMinus,
    C,
    CPlus,
    BMinus,
    B,
    BPlus,
    AMinus,
    A,
    APlus,
}

impl Grade {
    /// Ordinal value: `A+` = 12 down to `F` = 0
    #[inline]
    pub fn value(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::BMinus => "B-",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::CMinus => "C-",
            Grade::DPlus => "D+",
            Grade::D => "D",
            Grade::DMinus => "D-",
            Grade::F => "F",
        }
    }

    /// Parse a letter grade, returning `None` for anything off the scale
    pub fn parse(s: &str) -> Option<Grade> {
        let grade = match s.trim() {
            "A+" => Grade::APlus,
            "A" => Grade::A,
            "A-" => Grade::AMinus,
            "B+" => Grade::BPlus,
            "B" => Grade::B,
            "B-" => Grade::BMinus,
            "C+" => Grade::CPlus,
            "C" => Grade::C,
            "C-" => Grade::CMinus,
            "D+" => Grade::DPlus,
            "D" => Grade::D,
            "D-" => Grade::DMinus,
            "F" => Grade::F,
            _ => return None,
        };
        Some(grade)
    }
}

/// Ordinal value of an optional grade; a missing grade ranks as `F`
#[inline]
pub fn grade_value(grade: Option<Grade>) -> u8 {
    grade.map(|g| g.value()).unwrap_or(0)
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Grade::parse(s).ok_or_else(|| format!("invalid letter grade '{}'", s))
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Grade {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Grade::parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid letter grade '{}'", raw)))
    }
}

/// Catalog grade columns are free text; anything off the scale is treated as absent.
fn lenient_grade<'de, D>(deserializer: D) -> Result<Option<Grade>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Grade::parse))
}

/// Region column is free text as well; unknown names fall back to the state's regions.
fn lenient_region<'de, D>(deserializer: D) -> Result<Option<Region>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Region::parse))
}

fn default_tier() -> Tier {
    Tier::NonD1
}

/// Geographic region used by the geographic filter and region preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    Northeast,
    #[serde(rename = "Mid-Atlantic")]
    MidAtlantic,
    Midwest,
    South,
    West,
}

impl Region {
    pub const ALL: [Region; 5] = [
        Region::Northeast,
        Region::MidAtlantic,
        Region::Midwest,
        Region::South,
        Region::West,
    ];

    /// Case-insensitive match on the display name
    pub fn parse(s: &str) -> Option<Region> {
        let s = s.trim();
        Region::ALL.into_iter().find(|region| region.as_str().eq_ignore_ascii_case(s))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Northeast => "Northeast",
            Region::MidAtlantic => "Mid-Atlantic",
            Region::Midwest => "Midwest",
            Region::South => "South",
            Region::West => "West",
        }
    }

    /// Postal codes of the states in this region. Regions overlap.
    pub fn states(&self) -> &'static [&'static str] {
        match self {
            Region::Northeast => &["CT", "ME", "MA", "NH", "RI", "VT", "NJ", "NY", "PA"],
            Region::MidAtlantic => &["DE", "DC", "MD", "NJ", "NY", "PA", "VA", "WV"],
            Region::Midwest => &["IL", "IN", "IA", "KS", "MI", "MN", "MO", "NE", "ND", "OH", "SD", "WI"],
            Region::South => &[
                "AL", "AR", "DE", "DC", "FL", "GA", "KY", "LA", "MD", "MS", "NC", "OK", "SC", "TN", "TX",
                "VA", "WV",
            ],
            Region::West => &["AK", "AZ", "CA", "CO", "HI", "ID", "MT", "NV", "NM", "OR", "UT", "WA", "WY"],
        }
    }

    /// Case-insensitive state membership
    pub fn contains_state(&self, state: &str) -> bool {
        let state = state.trim();
        self.states().iter().any(|s| s.eq_ignore_ascii_case(state))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enrollment bucket derived from `undergrad_enrollment`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SizeCategory {
    Small,
    Medium,
    Large,
    #[serde(rename = "Very Large")]
    VeryLarge,
}

impl SizeCategory {
    pub fn from_enrollment(enrollment: u32) -> Self {
        match enrollment {
            0..=2_999 => SizeCategory::Small,
            3_000..=9_999 => SizeCategory::Medium,
            10_000..=29_999 => SizeCategory::Large,
            _ => SizeCategory::VeryLarge,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeCategory::Small => "Small",
            SizeCategory::Medium => "Medium",
            SizeCategory::Large => "Large",
            SizeCategory::VeryLarge => "Very Large",
        }
    }
}

impl fmt::Display for SizeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Party-scene bucket derived from `party_scene_grade`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PartyScene {
    Active,
    Moderate,
    Quiet,
}

impl PartyScene {
    /// `A+`/`A` are Active, `A-` through `B` Moderate, `B-` and below Quiet
    pub fn from_grade(grade: Grade) -> Self {
        if grade >= Grade::A {
            PartyScene::Active
        } else if grade >= Grade::B {
            PartyScene::Moderate
        } else {
            PartyScene::Quiet
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PartyScene::Active => "Active",
            PartyScene::Moderate => "Moderate",
            PartyScene::Quiet => "Quiet",
        }
    }
}

impl fmt::Display for PartyScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One school in the catalog. Read-only from the pipeline's point of view.
///
/// Field names follow the catalog table columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub school_name: String,
    #[serde(default)]
    pub school_state: Option<String>,
    #[serde(default, deserialize_with = "lenient_region")]
    pub school_region: Option<Region>,
    #[serde(rename = "division_group", default = "default_tier")]
    pub tier: Tier,
    #[serde(default)]
    pub in_state_tuition: Option<u32>,
    #[serde(default)]
    pub out_of_state_tuition: Option<u32>,
    /// Catalog rows use 0 for "not reported"; read through [`School::sat_average`]
    #[serde(default)]
    pub avg_sat: Option<u16>,
    /// Same convention as `avg_sat`; read through [`School::act_average`]
    #[serde(default)]
    pub avg_act: Option<u8>,
    /// Fraction in `[0, 1]`
    #[serde(default)]
    pub admission_rate: Option<f64>,
    #[serde(default)]
    pub undergrad_enrollment: Option<u32>,
    #[serde(default, deserialize_with = "lenient_grade")]
    pub overall_grade: Option<Grade>,
    #[serde(default, deserialize_with = "lenient_grade")]
    pub academics_grade: Option<Grade>,
    #[serde(default, deserialize_with = "lenient_grade")]
    pub student_life_grade: Option<Grade>,
    #[serde(alias = "total_athletics_grade", default, deserialize_with = "lenient_grade")]
    pub athletics_grade: Option<Grade>,
    #[serde(default, deserialize_with = "lenient_grade")]
    pub party_scene_grade: Option<Grade>,
}

impl School {
    /// Minimal record: everything but the name and tier unknown
    pub fn new(name: impl Into<String>, tier: Tier) -> Self {
        Self {
            school_name: name.into(),
            school_state: None,
            school_region: None,
            tier,
            in_state_tuition: None,
            out_of_state_tuition: None,
            avg_sat: None,
            avg_act: None,
            admission_rate: None,
            undergrad_enrollment: None,
            overall_grade: None,
            academics_grade: None,
            student_life_grade: None,
            athletics_grade: None,
            party_scene_grade: None,
        }
    }

    /// Whether the school is in the applicant's home state
    pub fn is_in_state(&self, home_state: &str) -> bool {
        self.school_state
            .as_deref()
            .map(|s| s.trim().eq_ignore_ascii_case(home_state.trim()))
            .unwrap_or(false)
    }

    /// Tuition the applicant would pay: in-state rates at home, out-of-state elsewhere
    pub fn applicable_tuition(&self, home_state: &str) -> Option<u32> {
        if self.is_in_state(home_state) {
            self.in_state_tuition
        } else {
            self.out_of_state_tuition
        }
    }

    /// Reported average SAT, with 0 treated as unreported
    pub fn sat_average(&self) -> Option<u16> {
        self.avg_sat.filter(|avg| *avg > 0)
    }

    /// Reported average ACT, with 0 treated as unreported
    pub fn act_average(&self) -> Option<u8> {
        self.avg_act.filter(|avg| *avg > 0)
    }

    pub fn size_category(&self) -> Option<SizeCategory> {
        self.undergrad_enrollment.map(SizeCategory::from_enrollment)
    }

    pub fn party_scene(&self) -> Option<PartyScene> {
        self.party_scene_grade.map(PartyScene::from_grade)
    }

    /// Ordinal quality used as the final ranking tiebreaker
    pub fn quality(&self) -> u8 {
        grade_value(self.overall_grade)
    }
}
