use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

const HEADER_KEYS: usize = 6;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: io::Error,
    },
    #[error("Invalid grid header in '{path}': {message}")]
    Header { path: String, message: String },
}

/// Axis-aligned bounding box in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn union(&self, other: &Extent) -> Extent {
        Extent {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// True when every bound and both side lengths are finite numbers.
    pub fn is_finite(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y, self.width(), self.height()]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// The header of an ESRI ASCII grid, with the lower-left reference normalized to the cell
/// corner.
#[derive(Debug, Clone, PartialEq)]
pub struct GridHeader {
    pub ncols: usize,
    pub nrows: usize,
    pub xllcorner: f64,
    pub yllcorner: f64,
    pub cellsize: f64,
    pub nodata: Option<f64>,
}

impl GridHeader {
    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, GridError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| GridError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::read_from(BufReader::new(file)).map_err(|e| match e {
            GridError::Io { source, .. } => GridError::Io {
                path: path.to_string_lossy().to_string(),
                source,
            },
            GridError::Header { message, .. } => GridError::Header {
                path: path.to_string_lossy().to_string(),
                message,
            },
        })
    }

    /// Reads the header lines, stopping at the first data row.
    pub fn read_from(reader: impl BufRead) -> Result<Self, GridError> {
        let mut ncols = None;
        let mut nrows = None;
        let mut xll = None;
        let mut yll = None;
        let mut centered = false;
        let mut cellsize = None;
        let mut nodata = None;

        for line in reader.lines().take(HEADER_KEYS) {
            let line = line.map_err(|e| GridError::Io {
                path: String::new(),
                source: e,
            })?;
            let mut parts = line.split_whitespace();
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                break;
            };
            if key.parse::<f64>().is_ok() {
                break;
            }
            match key.to_ascii_lowercase().as_str() {
                "ncols" => ncols = Some(parse_field::<usize>(key, value)?),
                "nrows" => nrows = Some(parse_field::<usize>(key, value)?),
                "xllcorner" => xll = Some(parse_field::<f64>(key, value)?),
                "yllcorner" => yll = Some(parse_field::<f64>(key, value)?),
                "xllcenter" => {
                    xll = Some(parse_field::<f64>(key, value)?);
                    centered = true;
                }
                "yllcenter" => {
                    yll = Some(parse_field::<f64>(key, value)?);
                    centered = true;
                }
                "cellsize" => cellsize = Some(parse_field::<f64>(key, value)?),
                "nodata_value" => nodata = Some(parse_field::<f64>(key, value)?),
                _ => return Err(header_error(format!("unknown header key '{key}'"))),
            }
        }

        let ncols = ncols.ok_or_else(|| header_error("missing 'ncols'"))?;
        let nrows = nrows.ok_or_else(|| header_error("missing 'nrows'"))?;
        let cellsize = cellsize.ok_or_else(|| header_error("missing 'cellsize'"))?;
        let mut xllcorner = xll.ok_or_else(|| header_error("missing 'xllcorner'"))?;
        let mut yllcorner = yll.ok_or_else(|| header_error("missing 'yllcorner'"))?;
        for (key, value) in [("xllcorner", xllcorner), ("yllcorner", yllcorner), ("cellsize", cellsize)] {
            if !value.is_finite() {
                return Err(header_error(format!("'{key}' must be finite, got {value}")));
            }
        }
        if ncols == 0 || nrows == 0 || cellsize <= 0.0 {
            return Err(header_error("grid has no cells"));
        }
        if centered {
            xllcorner -= cellsize / 2.0;
            yllcorner -= cellsize / 2.0;
        }

        let header = Self {
            ncols,
            nrows,
            xllcorner,
            yllcorner,
            cellsize,
            nodata,
        };
        if !header.extent().is_finite() {
            return Err(header_error("grid extent overflows"));
        }
        Ok(header)
    }

    pub fn extent(&self) -> Extent {
        Extent {
            min_x: self.xllcorner,
            min_y: self.yllcorner,
            max_x: self.xllcorner + self.ncols as f64 * self.cellsize,
            max_y: self.yllcorner + self.nrows as f64 * self.cellsize,
        }
    }

    /// Snaps a point to the centre of the cell that contains it, or `None` when the point
    /// falls outside the grid.
    pub fn cell_centre(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let col = ((x - self.xllcorner) / self.cellsize).floor();
        let row = ((y - self.yllcorner) / self.cellsize).floor();
        if col < 0.0 || row < 0.0 || col >= self.ncols as f64 || row >= self.nrows as f64 {
            return None;
        }
        Some((
            self.xllcorner + (col + 0.5) * self.cellsize,
            self.yllcorner + (row + 0.5) * self.cellsize,
        ))
    }
}

fn parse_field<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, GridError> {
    value
        .parse()
        .map_err(|_| header_error(format!("invalid value '{value}' for '{key}'")))
}

fn header_error(message: impl Into<String>) -> GridError {
    GridError::Header {
        path: String::new(),
        message: message.into(),
    }
}
