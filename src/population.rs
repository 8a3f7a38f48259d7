//! Population data types.

use serde::Serialize;

/// Lowest possible social score.
pub const MIN_SCORE: f64 = 1.0;
/// Highest possible social score.
pub const MAX_SCORE: f64 = 5.0;
/// Neutral midpoint of the score range.
pub const MID_SCORE: f64 = 3.0;

/// Socioeconomic class of a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SocioClass {
    Low,
    Medium,
    High,
}

impl SocioClass {
    pub const ALL: [SocioClass; 3] = [SocioClass::Low, SocioClass::Medium, SocioClass::High];
}

/// Highest education level reached by a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Education {
    Primary,
    Secondary,
    Higher,
    Postgraduate,
}

impl Education {
    pub const ALL: [Education; 4] = [
        Education::Primary,
        Education::Secondary,
        Education::Higher,
        Education::Postgraduate,
    ];
}

/// Named score bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Tier {
    Elite,
    Privileged,
    Popular,
    Seen,
    Invisible,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Elite,
        Tier::Privileged,
        Tier::Popular,
        Tier::Seen,
        Tier::Invisible,
    ];

    pub fn of_score(score: f64) -> Self {
        if score >= 4.5 {
            Tier::Elite
        } else if score >= 4.0 {
            Tier::Privileged
        } else if score >= 3.0 {
            Tier::Popular
        } else if score >= 2.0 {
            Tier::Seen
        } else {
            Tier::Invisible
        }
    }
}

/// Simulated individual.
///
/// Bounded attributes are clipped into their ranges on construction and
/// cannot be changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Person {
    id: usize,
    class: SocioClass,
    education: Education,
    age: u32,
    conformity: f64,
    authenticity: f64,
    tech_access: f64,
    initial_score: f64,
}

impl Person {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        class: SocioClass,
        education: Education,
        age: u32,
        conformity: f64,
        authenticity: f64,
        tech_access: f64,
        initial_score: f64,
    ) -> Self {
        Self {
            id,
            class,
            education,
            age: age.clamp(18, 79),
            conformity: conformity.clamp(0.0, 1.0),
            authenticity: authenticity.clamp(0.0, 1.0),
            tech_access: tech_access.clamp(0.3, 1.0),
            initial_score: initial_score.clamp(MIN_SCORE, MAX_SCORE),
        }
    }

    /// Unique identifier in `1..=N`.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn class(&self) -> SocioClass {
        self.class
    }

    pub fn education(&self) -> Education {
        self.education
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn conformity(&self) -> f64 {
        self.conformity
    }

    pub fn authenticity(&self) -> f64 {
        self.authenticity
    }

    pub fn tech_access(&self) -> f64 {
        self.tech_access
    }

    pub fn initial_score(&self) -> f64 {
        self.initial_score
    }
}

/// Daily scores of every person, stored row per person.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectories {
    n_days: usize,
    scores: Vec<f64>,
}

impl Trajectories {
    pub(crate) fn new(n_days: usize, scores: Vec<f64>) -> Self {
        debug_assert!(n_days > 0 && scores.len() % n_days == 0);
        Self { n_days, scores }
    }

    pub fn n_days(&self) -> usize {
        self.n_days
    }

    pub fn n_persons(&self) -> usize {
        self.scores.len() / self.n_days
    }

    /// Scores of the person at index `i_per` (id `i_per + 1`), day by day.
    pub fn trajectory(&self, i_per: usize) -> &[f64] {
        &self.scores[i_per * self.n_days..(i_per + 1) * self.n_days]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.scores.chunks_exact(self.n_days)
    }

    /// Scores of every person on day `day`.
    pub fn day(&self, day: usize) -> Vec<f64> {
        self.iter().map(|traj| traj[day]).collect()
    }

    pub fn final_scores(&self) -> Vec<f64> {
        self.day(self.n_days - 1)
    }

    /// Mean population score for each day.
    pub fn daily_mean(&self) -> Vec<f64> {
        let n_persons = self.n_persons() as f64;
        let mut sum = vec![0.0; self.n_days];
        for traj in self.iter() {
            for (acc, &score) in sum.iter_mut().zip(traj) {
                *acc += score;
            }
        }
        sum.into_iter().map(|val| val / n_persons).collect()
    }
}

/// All persons of a run, plus their trajectories once simulated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Population {
    persons: Vec<Person>,
    trajectories: Option<Trajectories>,
}

impl Population {
    pub fn new(persons: Vec<Person>) -> Self {
        Self {
            persons,
            trajectories: None,
        }
    }

    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    pub fn ids(&self) -> Vec<usize> {
        self.persons.iter().map(Person::id).collect()
    }

    pub fn initial_scores(&self) -> Vec<f64> {
        self.persons.iter().map(Person::initial_score).collect()
    }

    pub fn classes(&self) -> Vec<SocioClass> {
        self.persons.iter().map(Person::class).collect()
    }

    /// Trajectories, once the simulator has filled them.
    pub fn trajectories(&self) -> Option<&Trajectories> {
        self.trajectories.as_ref()
    }

    pub(crate) fn set_trajectories(&mut self, trajectories: Trajectories) {
        self.trajectories = Some(trajectories);
    }
}
