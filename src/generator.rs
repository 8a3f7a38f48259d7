use crate::error::SimError;
use crate::population::{Education, MAX_SCORE, MIN_SCORE, Person, Population, SocioClass};
use crate::rng::{POPULATION_STREAM, RandomContext};
use rand::Rng;
use rand_distr::{Distribution, Normal, weighted::WeightedIndex};

const PROB_CLASS: [f64; 3] = [0.3, 0.5, 0.2];
const PROB_EDUCATION: [f64; 4] = [0.2, 0.4, 0.3, 0.1];

fn class_bonus(class: SocioClass) -> f64 {
    match class {
        SocioClass::Low => -0.5,
        SocioClass::Medium => 0.0,
        SocioClass::High => 0.5,
    }
}

fn education_bonus(education: Education) -> f64 {
    match education {
        Education::Primary => -0.3,
        Education::Secondary => -0.1,
        Education::Higher => 0.2,
        Education::Postgraduate => 0.4,
    }
}

/// Initial score from a base draw and the static attributes, before clipping.
pub fn adjusted_score(
    base: f64,
    class: SocioClass,
    education: Education,
    tech_access: f64,
) -> f64 {
    base + class_bonus(class) + education_bonus(education) + (tech_access - 0.5) * 0.5
}

/// Generate a population of `n_persons` with ids `1..=n_persons`.
///
/// Every draw comes from the population stream of `ctx`, person by person.
pub fn generate_population(
    n_persons: usize,
    ctx: &RandomContext,
) -> Result<Population, SimError> {
    if n_persons == 0 {
        return Err(SimError::InvalidArgument(
            "population size must be positive".into(),
        ));
    }

    let mut rng = ctx.stream(POPULATION_STREAM);

    let class_dist = WeightedIndex::new(PROB_CLASS)?;
    let education_dist = WeightedIndex::new(PROB_EDUCATION)?;
    let conformity_dist = Normal::<f64>::new(0.7, 0.2)?;
    let authenticity_dist = Normal::<f64>::new(0.5, 0.2)?;
    let tech_dist = Normal::<f64>::new(0.8, 0.15)?;
    let score_dist = Normal::<f64>::new(3.5, 0.8)?;

    let mut persons = Vec::with_capacity(n_persons);
    for id in 1..=n_persons {
        let class = SocioClass::ALL[class_dist.sample(&mut rng)];
        let education = Education::ALL[education_dist.sample(&mut rng)];
        let age = rng.random_range(18..=79);
        let conformity = conformity_dist.sample(&mut rng).clamp(0.0, 1.0);
        let authenticity = authenticity_dist.sample(&mut rng).clamp(0.0, 1.0);
        let tech_access = tech_dist.sample(&mut rng).clamp(0.3, 1.0);

        let base = score_dist.sample(&mut rng);
        let score = adjusted_score(base, class, education, tech_access);

        persons.push(Person::new(
            id,
            class,
            education,
            age,
            conformity,
            authenticity,
            tech_access,
            score.clamp(MIN_SCORE, MAX_SCORE),
        ));
    }

    log::info!("generated {n_persons} persons");

    Ok(Population::new(persons))
}
