//! Pattern analyzer - classifies the long-term behavior of seeded patterns.
//!
//! An [`AnalysisRun`] steps a seeded grid one generation at a time, records
//! the population and the generation signature, and stops at the first
//! extinction or repeated shape, or at the generation horizon.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::{AnalysisConfig, Pattern, PatternLibrary};

use super::{
    Boundary, Census, FormationCensus, GenerationSignature, Grid, Repeat, Rule, SignatureTracker,
    Simulation,
};

/// Histories up to this length are drawn as a bar chart in reports.
const HISTORY_CHART_LIMIT: usize = 100;

/// Width of the longest population bar.
const HISTORY_BAR_WIDTH: f64 = 40.0;

/// Terminal verdict of an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    StillLife,
    Oscillator,
    Spaceship,
    /// Settled into a repeating state only after a long transient.
    Methuselah,
    Extinct,
    /// No repeat and no extinction before the horizon.
    Unresolved,
}

impl Classification {
    pub fn tag(self) -> &'static str {
        match self {
            Classification::StillLife => "still-life",
            Classification::Oscillator => "oscillator",
            Classification::Spaceship => "spaceship",
            Classification::Methuselah => "methuselah",
            Classification::Extinct => "extinct",
            Classification::Unresolved => "unresolved",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Lifecycle of one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Grid placed, nothing observed yet.
    Seeded,
    Running,
    /// Repeated its shape in place after one generation.
    Stabilized,
    /// Repeated its shape after more than one generation, or moved.
    Periodic,
    Extinct,
    /// Horizon reached without a verdict.
    Unresolved,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunState::Seeded | RunState::Running)
    }
}

/// Population summary of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationSummary {
    pub initial: u64,
    pub min: u64,
    pub max: u64,
    pub final_population: u64,
    /// First generation at which `max` was reached.
    pub generation_of_max: u64,
}

impl PopulationSummary {
    fn from_history(history: &[u64]) -> Self {
        let initial = history.first().copied().unwrap_or(0);
        let mut summary = Self {
            initial,
            min: initial,
            max: initial,
            final_population: history.last().copied().unwrap_or(0),
            generation_of_max: 0,
        };
        for (generation, &population) in history.iter().enumerate() {
            summary.min = summary.min.min(population);
            if population > summary.max {
                summary.max = population;
                summary.generation_of_max = generation as u64;
            }
        }
        summary
    }
}

/// Outcome of analyzing one pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub pattern_name: String,
    pub classification: Classification,
    /// Generations per cycle, 0 when no repeat was found.
    pub period: u64,
    /// Translation per period, present when the repeated shape moved.
    pub displacement: Option<(i64, i64)>,
    /// First generation of the repeating cycle.
    pub stabilized_at: Option<u64>,
    pub extinction_generation: Option<u64>,
    pub generations_simulated: u64,
    pub population: PopulationSummary,
    /// Population at every generation from 0 to `generations_simulated`.
    pub population_history: Vec<u64>,
    /// Known formations in the final grid.
    pub formations: Census,
    pub rule: Rule,
    pub elapsed: Duration,
}

impl AnalysisResult {
    /// Cells per generation along the dominant axis, for moving patterns.
    pub fn speed(&self) -> Option<f64> {
        let (dx, dy) = self.displacement?;
        (self.period > 0).then(|| dx.abs().max(dy.abs()) as f64 / self.period as f64)
    }

    /// Speed in units of `c`, reduced: `c/4` for the glider, `c/2` for the lwss.
    pub fn speed_notation(&self) -> Option<String> {
        let (dx, dy) = self.displacement?;
        if self.period == 0 {
            return None;
        }
        let cells = dx.unsigned_abs().max(dy.unsigned_abs());
        let divisor = gcd(cells, self.period);
        let (num, den) = (cells / divisor, self.period / divisor);
        Some(match (num, den) {
            (1, 1) => "c".to_string(),
            (1, den) => format!("c/{}", den),
            (num, 1) => format!("{}c", num),
            (num, den) => format!("{}c/{}", num, den),
        })
    }

    /// Average population change per generation.
    pub fn growth_rate(&self) -> f64 {
        if self.generations_simulated == 0 {
            return 0.0;
        }
        (self.population.final_population as f64 - self.population.initial as f64)
            / self.generations_simulated as f64
    }

    /// One-line description of the classification.
    pub fn verdict(&self) -> String {
        match self.classification {
            Classification::StillLife => {
                format!("still life (stable from generation {})", self.stabilized_at.unwrap_or(0))
            }
            Classification::Oscillator => format!(
                "oscillator with period {} (cycling from generation {})",
                self.period,
                self.stabilized_at.unwrap_or(0)
            ),
            Classification::Spaceship => {
                let (dx, dy) = self.displacement.unwrap_or((0, 0));
                format!(
                    "spaceship with period {}, displacement ({}, {}), speed {}",
                    self.period,
                    dx,
                    dy,
                    self.speed_notation().unwrap_or_default()
                )
            }
            Classification::Methuselah => format!(
                "methuselah (settled at generation {} into period {})",
                self.stabilized_at.unwrap_or(0),
                self.period
            ),
            Classification::Extinct => format!(
                "extinct (died out at generation {})",
                self.extinction_generation.unwrap_or(0)
            ),
            Classification::Unresolved => format!(
                "unresolved (long-lived, no period within {} generations, growth {:.2} cells/generation)",
                self.generations_simulated,
                self.growth_rate()
            ),
        }
    }

    /// Plain-text report.
    pub fn report(&self) -> String {
        let mut report = String::new();
        let title = format!("Pattern Analysis: {}", self.pattern_name);

        report.push_str(&format!("{}\n{}\n\n", title, "=".repeat(title.len())));
        report.push_str(&format!("Rule: {}\n", self.rule));
        report.push_str(&format!("Initial population: {}\n", self.population.initial));
        report.push_str(&format!("Final population: {}\n", self.population.final_population));
        report.push_str(&format!(
            "Maximum population: {} (generation {})\n",
            self.population.max, self.population.generation_of_max
        ));
        report.push_str(&format!("Minimum population: {}\n", self.population.min));
        report.push_str(&format!("Generations simulated: {}\n", self.generations_simulated));
        report.push_str(&format!("Analysis time: {:.2?}\n\n", self.elapsed));
        report.push_str(&format!(
            "Classification: {} - {}\n",
            self.classification,
            self.verdict()
        ));

        if !self.formations.formations.is_empty() || self.formations.unidentified > 0 {
            report.push_str("\nFormations in final generation:\n");
            for (name, count) in &self.formations.formations {
                report.push_str(&format!("  {:>4} x {}\n", count, name));
            }
            if self.formations.unidentified > 0 {
                report.push_str(&format!(
                    "  {:>4} x (unidentified)\n",
                    self.formations.unidentified
                ));
            }
        }

        if self.population_history.len() <= HISTORY_CHART_LIMIT {
            report.push_str("\nPopulation history:\n");
            let scale = HISTORY_BAR_WIDTH / self.population.max.max(1) as f64;
            for (generation, &population) in self.population_history.iter().enumerate() {
                let bar = (population as f64 * scale).round() as usize;
                report.push_str(&format!(
                    "{:5}: {:6} {}\n",
                    generation,
                    population,
                    "#".repeat(bar)
                ));
            }
        } else {
            report.push_str("\nPopulation key points:\n");
            let mut points: BTreeMap<u64, &str> = BTreeMap::new();
            points.insert(0, "start");
            let quarter = self.generations_simulated / 4;
            for i in 1..4 {
                points.entry(i * quarter).or_insert("");
            }
            points.insert(self.population.generation_of_max, "maximum");
            points.entry(self.generations_simulated).or_insert("end");

            for (generation, label) in points {
                let population = self.population_history[generation as usize];
                if label.is_empty() {
                    report.push_str(&format!("Generation {:5}: {}\n", generation, population));
                } else {
                    report.push_str(&format!(
                        "Generation {:5}: {} ({})\n",
                        generation, population, label
                    ));
                }
            }
        }

        report
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a.max(1) } else { gcd(b, a % b) }
}

/// Side-by-side table of several results.
pub fn comparison_report(results: &[AnalysisResult]) -> String {
    if results.is_empty() {
        return "No patterns to compare.\n".to_string();
    }

    let mut report = String::new();
    report.push_str("Pattern Comparison\n==================\n\n");
    report.push_str(&format!(
        "{:<16} | {:>8} | {:>8} | {:>8} | {:>6} | {:>10} | {:<12}\n",
        "Pattern", "Initial", "Max", "Final", "Period", "Generation", "Class"
    ));
    report.push_str(&format!(
        "{}-+-{}-+-{}-+-{}-+-{}-+-{}-+-{}\n",
        "-".repeat(16),
        "-".repeat(8),
        "-".repeat(8),
        "-".repeat(8),
        "-".repeat(6),
        "-".repeat(10),
        "-".repeat(12)
    ));

    for result in results {
        let period = if result.period > 0 {
            result.period.to_string()
        } else {
            "-".to_string()
        };
        report.push_str(&format!(
            "{:<16} | {:>8} | {:>8} | {:>8} | {:>6} | {:>10} | {:<12}\n",
            result.pattern_name,
            result.population.initial,
            result.population.max,
            result.population.final_population,
            period,
            result.generations_simulated,
            result.classification.tag()
        ));
    }

    let moving: Vec<_> = results.iter().filter(|r| r.speed().is_some()).collect();
    if !moving.is_empty() {
        report.push_str("\nSpeeds:\n");
        for result in moving {
            report.push_str(&format!(
                "{:<16}: {} ({:.3} cells/generation)\n",
                result.pattern_name,
                result.speed_notation().unwrap_or_default(),
                result.speed().unwrap_or(0.0)
            ));
        }
    }

    report
}

/// One analysis run, advanced generation by generation.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    name: String,
    simulation: Simulation,
    tracker: SignatureTracker,
    state: RunState,
    history: Vec<u64>,
    max_generations: u64,
    repeat: Option<Repeat>,
    extinct_at: Option<u64>,
}

impl AnalysisRun {
    pub fn new(name: impl Into<String>, grid: Grid, rule: Rule, max_generations: u64) -> Self {
        let tracker = SignatureTracker::new(&grid);
        Self {
            name: name.into(),
            simulation: Simulation::new(grid, rule),
            tracker,
            state: RunState::Seeded,
            history: Vec::new(),
            max_generations,
            repeat: None,
            extinct_at: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.simulation.generation()
    }

    pub fn grid(&self) -> &Grid {
        self.simulation.grid()
    }

    /// The repeat that ended the run, if any.
    pub fn repeat(&self) -> Option<Repeat> {
        self.repeat
    }

    /// Advance the state machine by one transition.
    ///
    /// `Seeded` observes generation 0 without stepping; `Running` steps one
    /// generation. Terminal states are left unchanged.
    pub fn advance(&mut self) -> RunState {
        match self.state {
            RunState::Seeded => {
                self.observe();
            }
            RunState::Running => {
                if self.simulation.generation() >= self.max_generations {
                    self.state = RunState::Unresolved;
                } else {
                    self.simulation.step();
                    self.observe();
                }
            }
            _ => return self.state,
        }

        if self.state.is_terminal() {
            debug!(
                "{}: {:?} at generation {}",
                self.name,
                self.state,
                self.simulation.generation()
            );
        }
        self.state
    }

    /// Advance until a terminal state.
    pub fn run_to_end(&mut self) -> RunState {
        while !self.state.is_terminal() {
            self.advance();
        }
        self.state
    }

    /// Record the current generation and pick the next state.
    fn observe(&mut self) {
        let generation = self.simulation.generation();
        let signature = GenerationSignature::of(self.simulation.grid());
        self.history.push(signature.population);

        if signature.population == 0 {
            self.extinct_at = Some(generation);
            self.state = RunState::Extinct;
            return;
        }

        self.state = match self.tracker.observe(generation, &signature) {
            Some(repeat) => {
                self.repeat = Some(repeat);
                if repeat.period == 1 && !repeat.is_translated() {
                    RunState::Stabilized
                } else {
                    RunState::Periodic
                }
            }
            None => RunState::Running,
        };
    }

    /// Classify a finished run. Unfinished runs count as unresolved.
    fn classify(&self, methuselah_threshold: u64) -> Classification {
        match (self.state, self.repeat) {
            (RunState::Extinct, _) => Classification::Extinct,
            (RunState::Stabilized | RunState::Periodic, Some(repeat)) => {
                if methuselah_threshold > 0 && repeat.first_generation >= methuselah_threshold {
                    Classification::Methuselah
                } else if repeat.is_translated() {
                    Classification::Spaceship
                } else if repeat.period == 1 {
                    Classification::StillLife
                } else {
                    Classification::Oscillator
                }
            }
            _ => Classification::Unresolved,
        }
    }

    /// Build the result of a finished run.
    pub fn finish(
        self,
        methuselah_threshold: u64,
        census: &FormationCensus,
        elapsed: Duration,
    ) -> AnalysisResult {
        let classification = self.classify(methuselah_threshold);
        let formations = census.identify(self.simulation.grid());
        let repeat = self.repeat.filter(|_| classification != Classification::Unresolved);

        AnalysisResult {
            pattern_name: self.name,
            classification,
            period: repeat.map_or(0, |r| r.period),
            displacement: repeat.filter(Repeat::is_translated).map(|r| r.displacement),
            stabilized_at: repeat.map(|r| r.first_generation),
            extinction_generation: self.extinct_at,
            generations_simulated: self.simulation.generation(),
            population: PopulationSummary::from_history(&self.history),
            population_history: self.history,
            formations,
            rule: *self.simulation.rule(),
            elapsed,
        }
    }
}

/// Runs pattern analyses with a shared configuration.
#[derive(Debug, Clone)]
pub struct PatternAnalyzer {
    config: AnalysisConfig,
    census: FormationCensus,
}

impl PatternAnalyzer {
    /// Analyzer identifying formations from the standard library.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        Self::with_library(config, &PatternLibrary::standard())
    }

    /// Analyzer identifying formations from a custom library.
    pub fn with_library(config: AnalysisConfig, library: &PatternLibrary) -> Result<Self> {
        config.validate()?;
        let census = FormationCensus::from_library(library, &config.rule);
        Ok(Self { config, census })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn empty_grid(&self) -> Result<Grid> {
        Grid::new(
            self.config.grid_width,
            self.config.grid_height,
            self.config.boundary,
        )
    }

    /// Grid seeded with `pattern` at `(x, y)`.
    ///
    /// Fails with `PatternOutOfBounds` if the footprint does not fit.
    pub fn seed(&self, pattern: &Pattern, x: u32, y: u32) -> Result<Grid> {
        let mut grid = self.empty_grid()?;
        grid.place_pattern_checked(pattern, x, y)?;
        Ok(grid)
    }

    /// Analyze `pattern` placed at `(x, y)`.
    pub fn analyze_pattern(&self, pattern: &Pattern, x: u32, y: u32) -> Result<AnalysisResult> {
        let grid = self.seed(pattern, x, y)?;
        Ok(self.analyze_grid(pattern.name(), grid))
    }

    /// Offset that centers `pattern` in the analysis grid.
    pub fn seed_offset(&self, pattern: &Pattern) -> Result<(u32, u32)> {
        pattern.centered_offset(&self.empty_grid()?)
    }

    /// Analyze `pattern` centered in the analysis grid.
    pub fn analyze_centered(&self, pattern: &Pattern) -> Result<AnalysisResult> {
        let (x, y) = self.seed_offset(pattern)?;
        self.analyze_pattern(pattern, x, y)
    }

    /// Analyze an already seeded grid. Its own size and boundary are used.
    pub fn analyze_grid(&self, name: &str, grid: Grid) -> AnalysisResult {
        let start = Instant::now();
        debug!(
            "Analyzing {} on {}x{} {} grid for up to {} generations",
            name,
            grid.width(),
            grid.height(),
            grid.boundary(),
            self.config.max_generations
        );

        let mut run = AnalysisRun::new(name, grid, self.config.rule, self.config.max_generations);
        run.run_to_end();
        let result = run.finish(self.config.methuselah_threshold, &self.census, start.elapsed());

        info!(
            "{}: {} after {} generations",
            result.pattern_name, result.classification, result.generations_simulated
        );
        result
    }

    /// Analyze several placements independently, in parallel.
    ///
    /// Every placement is checked before any run starts. Results keep the
    /// input order.
    pub fn compare_patterns(
        &self,
        placements: &[(&Pattern, u32, u32)],
    ) -> Result<Vec<AnalysisResult>> {
        let seeded = placements
            .iter()
            .map(|&(pattern, x, y)| self.seed(pattern, x, y).map(|grid| (pattern.name(), grid)))
            .collect::<Result<Vec<_>>>()?;

        Ok(seeded
            .into_par_iter()
            .map(|(name, grid)| self.analyze_grid(name, grid))
            .collect())
    }
}

/// Analyze a single pattern on a fresh analyzer with default rule and threshold.
pub fn analyze_pattern(
    pattern: &Pattern,
    x: u32,
    y: u32,
    max_generations: u64,
    grid_size: (u32, u32),
    boundary: Boundary,
) -> Result<AnalysisResult> {
    let config = AnalysisConfig {
        max_generations,
        grid_width: grid_size.0,
        grid_height: grid_size.1,
        boundary,
        ..Default::default()
    };
    PatternAnalyzer::new(config)?.analyze_pattern(pattern, x, y)
}
