//! Corrected read counts and per-locus metadata.
//!
//! The reconstruction only talks to [`CorrectedCountsView`]. [`CorrectedCounts`]
//! is the in-memory implementation backed by the pipeline's CSV output.

use ndarray::{Array2, ArrayView1};
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};

/// Leading metadata columns of the corrected counts CSV, in order.
pub const METADATA_COLUMNS: [&str; 5] = ["chr", "start", "end", "width", "candidate_brkp"];

/// Read-only query interface over a loci x cells corrected counts matrix.
pub trait CorrectedCountsView {
    fn locus_count(&self) -> usize;

    fn cell_count(&self) -> usize;

    fn corrected_count(&self, locus: usize, cell: usize) -> f64;

    fn chromosome_of(&self, locus: usize) -> u32;

    /// Genomic start of `locus`; `locus_count()` maps to the end of the last locus.
    fn bin_start(&self, locus: usize) -> u64;

    /// Absolute locus of a breakpoint candidate, None when out of range.
    fn candidate_to_locus(&self, candidate: usize) -> Option<usize>;

    fn candidate_count(&self) -> usize;

    fn is_last_locus_in_chromosome(&self, locus: usize) -> bool;

    fn chromosome_ends_were_synthesized(&self) -> bool;

    fn cell_names(&self) -> &[String];

    /// Reverse lookup of a locus by its genomic coordinates.
    fn locate(&self, chromosome: u32, bin_start: u64) -> Option<usize> {
        (0..self.locus_count())
            .find(|&l| self.chromosome_of(l) == chromosome && self.bin_start(l) == bin_start)
    }

    fn locus_to_candidate(&self, locus: usize) -> Option<usize> {
        (0..self.candidate_count()).find(|&c| self.candidate_to_locus(c) == Some(locus))
    }
}

/// Genomic bin metadata for one row of the counts matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locus {
    pub chromosome: u32,
    pub start: u64,
    pub end: u64,
    pub width: u64,
    pub candidate: bool,
}

/// Dense corrected counts with breakpoint candidate bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedCounts {
    loci: Vec<Locus>,
    cells: Vec<String>,
    counts: Array2<f64>,
    candidates: Vec<usize>,
    chromosome_ends_added: bool,
}

impl CorrectedCounts {
    /// Build from already parsed parts. `counts` must be loci x cells.
    pub fn new(loci: Vec<Locus>, cells: Vec<String>, counts: Array2<f64>) -> DomainResult<Self> {
        if loci.is_empty() {
            return Err(DomainError::counts_format(0, "no loci"));
        }
        if counts.dim() != (loci.len(), cells.len()) {
            return Err(DomainError::counts_format(
                0,
                format!(
                    "matrix is {}x{} but metadata describes {} loci and {} cells",
                    counts.nrows(),
                    counts.ncols(),
                    loci.len(),
                    cells.len()
                ),
            ));
        }
        for (i, pair) in loci.windows(2).enumerate() {
            if pair[0].chromosome == pair[1].chromosome && pair[1].start < pair[0].start {
                return Err(DomainError::counts_format(
                    i + 3,
                    format!(
                        "bin start {} precedes {} on chromosome {}",
                        pair[1].start, pair[0].start, pair[1].chromosome
                    ),
                ));
            }
        }
        let candidates = candidate_loci(&loci);
        Ok(Self {
            loci,
            cells,
            counts,
            candidates,
            chromosome_ends_added: false,
        })
    }

    /// Parse the comma separated corrected counts table.
    ///
    /// The header must start with `chr,start,end,width,candidate_brkp`; every
    /// further column is a cell.
    #[instrument(level = "debug", skip(content))]
    pub fn parse(content: &str) -> DomainResult<Self> {
        let mut lines = content
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty());

        let (_, header) = lines
            .next()
            .ok_or_else(|| DomainError::counts_format(1, "missing header"))?;
        let header: Vec<&str> = header.split(',').map(|h| h.trim().trim_matches('"')).collect();
        if header.len() < METADATA_COLUMNS.len()
            || header[..METADATA_COLUMNS.len()] != METADATA_COLUMNS
        {
            return Err(DomainError::counts_format(
                1,
                format!("header must start with {}", METADATA_COLUMNS.join(",")),
            ));
        }
        let cells: Vec<String> = header[METADATA_COLUMNS.len()..]
            .iter()
            .map(|c| c.to_string())
            .collect();

        let mut loci = Vec::new();
        let mut values = Vec::new();
        for (idx, line) in lines {
            let line_no = idx + 1;
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != header.len() {
                return Err(DomainError::counts_format(
                    line_no,
                    format!("expected {} fields, found {}", header.len(), fields.len()),
                ));
            }
            loci.push(Locus {
                chromosome: parse_chromosome(fields[0]).ok_or_else(|| {
                    DomainError::counts_format(line_no, format!("bad chromosome '{}'", fields[0]))
                })?,
                start: parse_integral(fields[1], line_no, "start")?,
                end: parse_integral(fields[2], line_no, "end")?,
                width: parse_integral(fields[3], line_no, "width")?,
                candidate: parse_float(fields[4], line_no, "candidate_brkp")? > 0.0,
            });
            for field in &fields[METADATA_COLUMNS.len()..] {
                values.push(parse_float(field, line_no, "corrected count")?);
            }
        }

        let counts = Array2::from_shape_vec((loci.len(), cells.len()), values)
            .map_err(|e| DomainError::counts_format(0, e.to_string()))?;
        let parsed = Self::new(loci, cells, counts)?;
        debug!(
            "parsed {} loci, {} cells, {} breakpoint candidates",
            parsed.locus_count(),
            parsed.cell_count(),
            parsed.candidate_count()
        );
        Ok(parsed)
    }

    /// Append one synthetic neutral locus after the last bin of every chromosome.
    ///
    /// The added loci are breakpoint candidates so events can end at a
    /// chromosome boundary. Calling this twice has no further effect.
    #[instrument(level = "debug", skip(self))]
    pub fn add_chromosome_ends(&mut self, neutral_cn: f64, end_bin_length: u64) {
        if self.chromosome_ends_added {
            return;
        }
        let mut loci = Vec::with_capacity(self.loci.len() + 24);
        // Row of the current matrix each new locus copies, None for synthetic ends
        let mut sources = Vec::with_capacity(self.loci.len() + 24);

        for (idx, locus) in self.loci.iter().enumerate() {
            loci.push(locus.clone());
            sources.push(Some(idx));
            if self.is_last_locus_in_chromosome(idx) {
                loci.push(Locus {
                    chromosome: locus.chromosome,
                    start: locus.end,
                    end: locus.end + end_bin_length,
                    width: end_bin_length,
                    candidate: true,
                });
                sources.push(None);
            }
        }

        let added = loci.len() - self.loci.len();
        self.counts = Array2::from_shape_fn((loci.len(), self.cells.len()), |(row, cell)| {
            match sources[row] {
                Some(source) => self.counts[[source, cell]],
                None => neutral_cn,
            }
        });
        self.loci = loci;
        self.candidates = candidate_loci(&self.loci);
        self.chromosome_ends_added = true;
        debug!("added {} chromosome end loci", added);
    }

    pub fn loci(&self) -> &[Locus] {
        &self.loci
    }

    pub fn locus(&self, locus: usize) -> &Locus {
        &self.loci[locus]
    }

    pub fn counts_row(&self, locus: usize) -> ArrayView1<'_, f64> {
        self.counts.row(locus)
    }

    pub fn candidate_loci(&self) -> &[usize] {
        &self.candidates
    }
}

impl CorrectedCountsView for CorrectedCounts {
    fn locus_count(&self) -> usize {
        self.loci.len()
    }

    fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn corrected_count(&self, locus: usize, cell: usize) -> f64 {
        self.counts[[locus, cell]]
    }

    fn chromosome_of(&self, locus: usize) -> u32 {
        self.loci[locus].chromosome
    }

    fn bin_start(&self, locus: usize) -> u64 {
        match self.loci.get(locus) {
            Some(l) => l.start,
            // one past the last locus: the genome end
            None => self.loci.last().map_or(0, |l| l.end),
        }
    }

    fn candidate_to_locus(&self, candidate: usize) -> Option<usize> {
        self.candidates.get(candidate).copied()
    }

    fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    fn is_last_locus_in_chromosome(&self, locus: usize) -> bool {
        match self.loci.get(locus + 1) {
            Some(next) => next.chromosome != self.loci[locus].chromosome,
            None => locus < self.loci.len(),
        }
    }

    fn chromosome_ends_were_synthesized(&self) -> bool {
        self.chromosome_ends_added
    }

    fn cell_names(&self) -> &[String] {
        &self.cells
    }

    fn locus_to_candidate(&self, locus: usize) -> Option<usize> {
        self.candidates.binary_search(&locus).ok()
    }
}

fn candidate_loci(loci: &[Locus]) -> Vec<usize> {
    loci.iter()
        .enumerate()
        .filter(|(_, l)| l.candidate)
        .map(|(i, _)| i)
        .collect()
}

/// Chromosome ids are numeric; `X` and `Y` map to 23 and 24.
pub fn parse_chromosome(s: &str) -> Option<u32> {
    let s = s.trim().trim_matches('"');
    let s = s.strip_prefix("chr").unwrap_or(s);
    match s {
        "X" | "x" => Some(23),
        "Y" | "y" => Some(24),
        _ => s.parse::<u32>().ok().or_else(|| {
            s.parse::<f64>()
                .ok()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u32)
        }),
    }
}

fn parse_integral(s: &str, line: usize, column: &str) -> DomainResult<u64> {
    s.parse::<u64>()
        .ok()
        .or_else(|| {
            s.parse::<f64>()
                .ok()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        })
        .ok_or_else(|| DomainError::counts_format(line, format!("bad {} '{}'", column, s)))
}

fn parse_float(s: &str, line: usize, column: &str) -> DomainResult<f64> {
    s.parse::<f64>()
        .map_err(|_| DomainError::counts_format(line, format!("bad {} '{}'", column, s)))
}
