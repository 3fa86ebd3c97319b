//! Multi-objective genetic search over grid candidates.
//!
//! Two real genes (spacing, angle), two objectives (maximize residential
//! area, minimize fragment count). Survivor selection is elitist mu+lambda:
//! parents and offspring compete, non-dominated rank then crowding distance
//! decide who stays. The operator set is built fresh per call; the search is
//! a pure function of (land, exclusion, config).

use geo::MultiPolygon;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;

use crate::skeleton::grid;

/// Per-gene probability of applying a mutation.
const MUTATION_PROB: f64 = 0.3;
/// Mutation step span as a fraction of the gene's bounded range.
const MUTATION_SPAN: f64 = 0.2;

/// Stateless search configuration, constructed per call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GeneticConfig {
    pub spacing_bounds: (f64, f64),
    pub angle_bounds: (f64, f64),
    pub population_size: usize,
    pub generations: usize,
    pub seed: u64,
}

/// A grid candidate: cell side length in metres, rotation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridParams {
    pub spacing: f64,
    pub angle: f64,
}

/// Best individual of one generation, kept for the report history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationBest {
    pub spacing: f64,
    pub angle: f64,
    pub residential_area: f64,
    pub fragments: usize,
}

#[derive(Debug, Clone, Copy)]
struct Individual {
    params: GridParams,
    residential_area: f64,
    fragments: usize,
}

/// Pareto dominance: at least as good on both objectives, better on one.
fn dominates(a: &Individual, b: &Individual) -> bool {
    a.residential_area >= b.residential_area
        && a.fragments <= b.fragments
        && (a.residential_area > b.residential_area || a.fragments < b.fragments)
}

/// Fast non-dominated sort; returns fronts as index lists, best first.
fn non_dominated_fronts(pop: &[Individual]) -> Vec<Vec<usize>> {
    let n = pop.len();
    let mut dominated_by = vec![0usize; n];
    let mut beats: Vec<Vec<usize>> = vec![Vec::new(); n];

    for i in 0..n {
        for j in 0..n {
            if i != j && dominates(&pop[i], &pop[j]) {
                beats[i].push(j);
                dominated_by[j] += 1;
            }
        }
    }

    let mut fronts = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| dominated_by[i] == 0).collect();
    while !current.is_empty() {
        let mut next = Vec::new();
        for &i in &current {
            for &j in &beats[i] {
                dominated_by[j] -= 1;
                if dominated_by[j] == 0 { next.push(j) }
            }
        }
        fronts.push(std::mem::take(&mut current));
        current = next;
    }
    fronts
}

/// Crowding distance of each member of one front (aligned with front order).
fn crowding_distances(front: &[usize], pop: &[Individual]) -> Vec<f64> {
    let m = front.len();
    if m <= 2 { return vec![f64::INFINITY; m] }

    let mut dist = vec![0.0; m];
    // Both objectives oriented so that larger is better.
    let objectives: [fn(&Individual) -> f64; 2] = [
        |ind| ind.residential_area,
        |ind| -(ind.fragments as f64),
    ];

    for objective in objectives {
        let mut order: Vec<usize> = (0..m).collect();
        order.sort_by(|&a, &b| objective(&pop[front[a]]).total_cmp(&objective(&pop[front[b]])));

        let lo = objective(&pop[front[order[0]]]);
        let hi = objective(&pop[front[order[m - 1]]]);
        dist[order[0]] = f64::INFINITY;
        dist[order[m - 1]] = f64::INFINITY;

        if hi - lo > 1e-12 {
            for k in 1..m - 1 {
                let prev = objective(&pop[front[order[k - 1]]]);
                let next = objective(&pop[front[order[k + 1]]]);
                dist[order[k]] += (next - prev) / (hi - lo);
            }
        }
    }
    dist
}

/// Elitist survivor selection: fill from the best front down, break ties in
/// the last admitted front by crowding distance (descending).
fn select_survivors(combined: Vec<Individual>, n: usize) -> Vec<Individual> {
    let fronts = non_dominated_fronts(&combined);
    let mut survivors = Vec::with_capacity(n);

    for front in fronts {
        if survivors.len() + front.len() <= n {
            survivors.extend(front.iter().map(|&i| combined[i]));
        } else {
            let dist = crowding_distances(&front, &combined);
            let mut order: Vec<usize> = (0..front.len()).collect();
            order.sort_by(|&a, &b| dist[b].total_cmp(&dist[a]));
            for &k in order.iter().take(n - survivors.len()) {
                survivors.push(combined[front[k]]);
            }
        }
        if survivors.len() >= n { break }
    }
    survivors
}

/// Binary tournament on dominance; ties resolved by coin flip.
fn tournament(pop: &[Individual], rng: &mut StdRng) -> Individual {
    let a = pop[rng.random_range(0..pop.len())];
    let b = pop[rng.random_range(0..pop.len())];
    if dominates(&a, &b) { a }
    else if dominates(&b, &a) { b }
    else if rng.random_bool(0.5) { a }
    else { b }
}

/// Best individual of a population: rank-0, then most residential area,
/// then fewest fragments. Deterministic for a fixed population order.
fn best_of(pop: &[Individual]) -> Individual {
    debug_assert!(!pop.is_empty(), "population must not be empty");
    pop.iter()
        .filter(|a| !pop.iter().any(|b| dominates(b, a)))
        .max_by(|a, b| {
            a.residential_area.total_cmp(&b.residential_area)
                .then(b.fragments.cmp(&a.fragments))
        })
        .copied()
        .unwrap_or(pop[0])
}

fn record(ind: &Individual) -> GenerationBest {
    GenerationBest {
        spacing: ind.params.spacing,
        angle: ind.params.angle,
        residential_area: ind.residential_area,
        fragments: ind.fragments,
    }
}

#[inline]
fn clamp(value: f64, bounds: (f64, f64)) -> f64 {
    value.max(bounds.0).min(bounds.1)
}

/// Run the genetic search. Returns the best final parameters and the history
/// of per-generation bests (length `generations + 1`: generation 0 plus one
/// entry per evolution step).
pub(crate) fn optimize(
    config: &GeneticConfig,
    land: &MultiPolygon<f64>,
    exclusion: Option<&MultiPolygon<f64>>,
) -> (GridParams, Vec<GenerationBest>) {
    assert!(config.population_size >= 2, "population_size must be at least 2");

    let mut rng = StdRng::seed_from_u64(config.seed);
    let evaluate = |params: GridParams| -> Individual {
        let eval = grid::evaluate(land, exclusion, params.spacing, params.angle);
        Individual {
            params,
            residential_area: eval.residential_area,
            fragments: eval.fragments,
        }
    };

    let spacing_range = config.spacing_bounds.1 - config.spacing_bounds.0;
    let angle_range = config.angle_bounds.1 - config.angle_bounds.0;

    // Generation 0: uniform-random population within bounds.
    let mut population: Vec<Individual> = (0..config.population_size)
        .map(|_| {
            let params = GridParams {
                spacing: config.spacing_bounds.0 + rng.random::<f64>() * spacing_range,
                angle: config.angle_bounds.0 + rng.random::<f64>() * angle_range,
            };
            evaluate(params)
        })
        .collect();

    let mut history = Vec::with_capacity(config.generations + 1);
    history.push(record(&best_of(&population)));

    for _ in 0..config.generations {
        let mut offspring = Vec::with_capacity(config.population_size);
        for _ in 0..config.population_size {
            let a = tournament(&population, &mut rng);
            let b = tournament(&population, &mut rng);

            // Blend crossover per gene.
            let t = rng.random::<f64>();
            let mut spacing = t * a.params.spacing + (1.0 - t) * b.params.spacing;
            let t = rng.random::<f64>();
            let mut angle = t * a.params.angle + (1.0 - t) * b.params.angle;

            // Bounded mutation.
            if rng.random_bool(MUTATION_PROB) {
                spacing += (rng.random::<f64>() - 0.5) * MUTATION_SPAN * spacing_range;
            }
            if rng.random_bool(MUTATION_PROB) {
                angle += (rng.random::<f64>() - 0.5) * MUTATION_SPAN * angle_range;
            }

            let params = GridParams {
                spacing: clamp(spacing, config.spacing_bounds),
                angle: clamp(angle, config.angle_bounds),
            };
            offspring.push(evaluate(params));
        }

        population.extend(offspring);
        population = select_survivors(population, config.population_size);
        history.push(record(&best_of(&population)));
    }

    (best_of(&population).params, history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::rect_polygon;
    use geo::MultiPolygon;

    fn square_land(side: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![rect_polygon(0.0, 0.0, side, side)])
    }

    fn small_config(seed: u64) -> GeneticConfig {
        GeneticConfig {
            spacing_bounds: (20.0, 40.0),
            angle_bounds: (0.0, 90.0),
            population_size: 8,
            generations: 3,
            seed,
        }
    }

    #[test]
    fn history_has_one_entry_per_generation_plus_initial() {
        let land = square_land(100.0);
        let (_, history) = optimize(&small_config(7), &land, None);
        assert_eq!(history.len(), 4);

        let mut config = small_config(7);
        config.generations = 0;
        let (_, history) = optimize(&config, &land, None);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn all_results_stay_within_bounds() {
        let land = square_land(100.0);
        let config = small_config(11);
        let (best, history) = optimize(&config, &land, None);

        for entry in history.iter().chain(std::iter::once(&GenerationBest {
            spacing: best.spacing,
            angle: best.angle,
            residential_area: 0.0,
            fragments: 0,
        })) {
            assert!(entry.spacing >= config.spacing_bounds.0 && entry.spacing <= config.spacing_bounds.1);
            assert!(entry.angle >= config.angle_bounds.0 && entry.angle <= config.angle_bounds.1);
        }
    }

    #[test]
    fn search_is_deterministic_for_a_fixed_seed() {
        let land = square_land(100.0);
        let (best_a, history_a) = optimize(&small_config(42), &land, None);
        let (best_b, history_b) = optimize(&small_config(42), &land, None);
        assert_eq!(best_a, best_b);
        assert_eq!(history_a, history_b);
    }

    #[test]
    fn final_best_is_not_dominated_by_any_recorded_generation() {
        let land = square_land(100.0);
        let (_, history) = optimize(&small_config(3), &land, None);
        let last = history.last().unwrap();
        for earlier in &history {
            let strictly_better = earlier.residential_area > last.residential_area
                && earlier.fragments < last.fragments;
            assert!(!strictly_better);
        }
    }

    #[test]
    fn dominance_is_strict() {
        let make = |area: f64, fragments: usize| Individual {
            params: GridParams { spacing: 20.0, angle: 0.0 },
            residential_area: area,
            fragments,
        };
        assert!(dominates(&make(10.0, 1), &make(5.0, 2)));
        assert!(dominates(&make(10.0, 1), &make(10.0, 2)));
        assert!(!dominates(&make(10.0, 1), &make(10.0, 1)));
        assert!(!dominates(&make(10.0, 2), &make(5.0, 1))); // trade-off: no dominance
    }

    #[test]
    fn survivor_selection_keeps_the_pareto_front() {
        let make = |area: f64, fragments: usize| Individual {
            params: GridParams { spacing: 20.0, angle: 0.0 },
            residential_area: area,
            fragments,
        };
        // Front: (10,1), (12,3); dominated: (9,2), (8,5).
        let combined = vec![make(10.0, 1), make(9.0, 2), make(12.0, 3), make(8.0, 5)];
        let survivors = select_survivors(combined, 2);
        let areas: Vec<f64> = survivors.iter().map(|s| s.residential_area).collect();
        assert!(areas.contains(&10.0) && areas.contains(&12.0));
    }
}
