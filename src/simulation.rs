use crate::config::BehaviorParams;
use crate::error::SimError;
use crate::population::{
    Education, MAX_SCORE, MID_SCORE, MIN_SCORE, Person, Population, SocioClass, Trajectories,
};
use crate::rng::RandomContext;
use rand_chacha::ChaCha12Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;

/// Daily score evolution engine.
///
/// Days are computed one after the other. Within a day every person is
/// updated in parallel from its previous score and its own random stream,
/// so the result does not depend on the number of worker threads.
pub struct Simulator {
    params: BehaviorParams,
}

impl Simulator {
    pub fn new(params: BehaviorParams) -> Result<Self, SimError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Fill the trajectories of `population` for days `1..n_days`.
    pub fn run(&self, population: &mut Population, ctx: &RandomContext) -> Result<(), SimError> {
        if population.is_empty() {
            return Err(SimError::InvalidArgument(
                "population must not be empty".into(),
            ));
        }

        let n_days = self.params.n_days;
        let persons = population.persons();

        let mut scores = vec![0.0; persons.len() * n_days];
        for (traj, per) in scores.chunks_exact_mut(n_days).zip(persons) {
            traj[0] = per.initial_score();
        }

        let mut rng_vec: Vec<ChaCha12Rng> =
            persons.iter().map(|per| ctx.agent_stream(per.id())).collect();

        let noise_dist = Normal::new(0.0, self.params.volatility)?;

        const N_REPORTS: usize = 10;
        let days_per_report = (n_days / N_REPORTS).max(1);

        for day in 1..n_days {
            scores
                .par_chunks_exact_mut(n_days)
                .zip(persons.par_iter())
                .zip(rng_vec.par_iter_mut())
                .for_each(|((traj, per), rng)| {
                    let noise = noise_dist.sample(rng);
                    traj[day] = self.next_score(per, traj[day - 1], noise);
                });

            if day % days_per_report == 0 || day + 1 == n_days {
                let progress = 100.0 * (day + 1) as f64 / n_days as f64;
                log::info!("completed {progress:06.2}%");
            }
        }

        population.set_trajectories(Trajectories::new(n_days, scores));

        Ok(())
    }

    /// Score on the next day, given the previous one and the noise draw.
    pub fn next_score(&self, per: &Person, prev: f64, noise: f64) -> f64 {
        let par = &self.params;

        let conformity_f = per.conformity() * par.w_conformity;
        let authenticity_f = per.authenticity() * par.w_authenticity;

        let class_f = match per.class() {
            SocioClass::High => 0.1,
            SocioClass::Medium => 0.0,
            SocioClass::Low => -0.1,
        } * par.w_class;

        let education_f = match per.education() {
            Education::Primary => -0.05,
            Education::Secondary => 0.0,
            Education::Higher => 0.05,
            Education::Postgraduate => 0.1,
        } * par.w_education;

        let tech_f = (per.tech_access() - 0.5) * par.w_technology;

        let dist = prev - MID_SCORE;
        let momentum_f = dist * 0.01 * par.momentum;
        let polar_f = dist.abs() * dist.signum() * par.polarization;

        let next = prev
            + noise
            + conformity_f
            + authenticity_f
            + class_f
            + education_f
            + tech_f
            + momentum_f
            + polar_f;

        next.clamp(MIN_SCORE, MAX_SCORE)
    }
}
