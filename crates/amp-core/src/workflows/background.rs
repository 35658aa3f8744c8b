use crate::core::io::grid::{GridError, GridHeader};
use crate::core::models::layer::Layer;
use crate::core::models::sample::Sample;
use crate::engine::config::{Config, OptionKey};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

/// Species label given to every background point.
pub const BACKGROUND_SPECIES: &str = "background";

const DEFAULT_ATTEMPTS_PER_POINT: usize = 10;

/// Draws pseudo-absence locations across a study area described by grid headers.
pub trait BackgroundSampler: Send + Sync {
    fn sample(&self, grids: &[GridHeader], n: usize, rng: &mut dyn RngCore) -> Vec<Sample>;
}

/// Uniform sampling over the union of the grid extents.
///
/// Each candidate is snapped to the centre of the first grid cell containing it; candidates
/// that land between grids or repeat an already drawn cell are discarded. Sampling gives up
/// after `attempts_per_point * n` candidates, so fewer than `n` points may be returned.
#[derive(Debug, Clone)]
pub struct ExtentSampler {
    pub attempts_per_point: usize,
}

impl Default for ExtentSampler {
    fn default() -> Self {
        Self {
            attempts_per_point: DEFAULT_ATTEMPTS_PER_POINT,
        }
    }
}

impl BackgroundSampler for ExtentSampler {
    fn sample(&self, grids: &[GridHeader], n: usize, rng: &mut dyn RngCore) -> Vec<Sample> {
        let Some(extent) = grids
            .iter()
            .map(GridHeader::extent)
            .reduce(|acc, e| acc.union(&e))
        else {
            return Vec::new();
        };
        if !extent.is_finite() || extent.width() <= 0.0 || extent.height() <= 0.0 {
            warn!("Study area {:?} cannot be sampled.", extent);
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut points = Vec::with_capacity(n);
        for _ in 0..n.saturating_mul(self.attempts_per_point) {
            if points.len() == n {
                break;
            }
            let x = rng.gen_range(extent.min_x..extent.max_x);
            let y = rng.gen_range(extent.min_y..extent.max_y);
            let Some((cx, cy)) = grids.iter().find_map(|g| g.cell_centre(x, y)) else {
                continue;
            };
            if seen.insert((cx.to_bits(), cy.to_bits())) {
                points.push(Sample::new(BACKGROUND_SPECIES, cx, cy));
            }
        }

        if points.len() < n {
            warn!(
                "Drew {} of {} requested background points; the study area has too few distinct cells.",
                points.len(),
                n
            );
        }
        points
    }
}

/// The seed requested by the configuration's `randomseed` option, if any.
pub fn seed_from(config: &Config) -> Option<u64> {
    config
        .option(OptionKey::RandomSeed)
        .and_then(|v| v.parse::<i64>().ok())
        .map(|v| v as u64)
}

/// Reads the headers of `grids` and draws up to `n` background points across them.
#[instrument(skip_all, name = "background_workflow", fields(grids = grids.len(), n = n))]
pub fn run(
    config: &Config,
    grids: &[Layer],
    n: usize,
    sampler: &dyn BackgroundSampler,
) -> Result<Vec<Sample>, GridError> {
    if n == 0 || grids.is_empty() {
        return Ok(Vec::new());
    }
    let headers = grids
        .iter()
        .map(|g| GridHeader::read_from_path(g.path()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut rng = match seed_from(config) {
        Some(seed) => {
            debug!("Seeding background sampler with {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };
    Ok(sampler.sample(&headers, n, &mut rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::ConfigBuilder;
    use std::fs;
    use tempfile::tempdir;

    fn header(xll: f64, yll: f64, ncols: usize, nrows: usize) -> GridHeader {
        GridHeader {
            ncols,
            nrows,
            xllcorner: xll,
            yllcorner: yll,
            cellsize: 1.0,
            nodata: Some(-9999.0),
        }
    }

    #[test]
    fn points_are_distinct_cell_centres_inside_the_grids() {
        let grids = [header(0.0, 0.0, 10, 10)];
        let mut rng = StdRng::seed_from_u64(7);

        let points = ExtentSampler::default().sample(&grids, 25, &mut rng);

        assert_eq!(points.len(), 25);
        let mut cells = HashSet::new();
        for p in &points {
            assert_eq!(p.species, BACKGROUND_SPECIES);
            assert_eq!(p.longitude.fract(), 0.5);
            assert_eq!(p.latitude.fract(), 0.5);
            assert!((0.0..10.0).contains(&p.longitude));
            assert!((0.0..10.0).contains(&p.latitude));
            assert!(cells.insert((p.longitude.to_bits(), p.latitude.to_bits())));
        }
    }

    #[test]
    fn request_larger_than_the_grid_returns_every_cell_at_most_once() {
        let grids = [header(0.0, 0.0, 2, 2)];
        let mut rng = StdRng::seed_from_u64(1);

        let points = ExtentSampler {
            attempts_per_point: 50,
        }
        .sample(&grids, 10, &mut rng);

        assert_eq!(points.len(), 4);
    }

    #[test]
    fn no_grids_yields_no_points() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(ExtentSampler::default().sample(&[], 5, &mut rng).is_empty());
    }

    #[test]
    fn same_seed_draws_the_same_points() {
        let dir = tempdir().unwrap();
        let grid = dir.path().join("bio1.asc");
        fs::write(
            &grid,
            "ncols 20\nnrows 20\nxllcorner -120\nyllcorner 30\ncellsize 0.5\nNODATA_value -9999\n",
        )
        .unwrap();
        let config = ConfigBuilder::new(dir.path())
            .unwrap()
            .add_option(OptionKey::RandomSeed, "20")
            .unwrap()
            .build();
        let layers = [Layer::new(&grid)];

        let first = run(&config, &layers, 15, &ExtentSampler::default()).unwrap();
        let second = run(&config, &layers, 15, &ExtentSampler::default()).unwrap();

        assert_eq!(first.len(), 15);
        assert_eq!(first, second);
        assert_eq!(seed_from(&config), Some(20));
    }

    #[test]
    fn unreadable_grid_is_an_error() {
        let dir = tempdir().unwrap();
        let config = ConfigBuilder::new(dir.path()).unwrap().build();
        let layers = [Layer::new(dir.path().join("missing.asc"))];

        let result = run(&config, &layers, 3, &ExtentSampler::default());
        assert!(matches!(result, Err(GridError::Io { .. })));
    }

    #[test]
    fn degenerate_study_area_yields_no_points() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut nan = header(0.0, 0.0, 4, 4);
        nan.cellsize = f64::NAN;
        let infinite = header(f64::INFINITY, 0.0, 4, 4);

        for grids in [[nan], [infinite]] {
            assert!(ExtentSampler::default().sample(&grids, 5, &mut rng).is_empty());
        }
    }

    #[test]
    fn non_finite_grid_header_is_an_error() {
        let dir = tempdir().unwrap();
        let config = ConfigBuilder::new(dir.path()).unwrap().build();
        for (i, header) in [
            "ncols 4\nnrows 4\nxllcorner 0\nyllcorner 0\ncellsize NaN\n",
            "ncols 4\nnrows 4\nxllcorner inf\nyllcorner 0\ncellsize 1\n",
            "ncols 4\nnrows 4\nxllcorner 0\nyllcorner 0\ncellsize 1e308\n",
        ]
        .into_iter()
        .enumerate()
        {
            let grid = dir.path().join(format!("grid{i}.asc"));
            fs::write(&grid, header).unwrap();

            let result = run(&config, &[Layer::new(&grid)], 3, &ExtentSampler::default());
            assert!(matches!(result, Err(GridError::Header { .. })), "{header:?} was accepted");
        }
    }
}
