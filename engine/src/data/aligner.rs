// Aligns one or more price series onto a shared date index
use crate::error::{EngineError, EngineResult};
use chrono::{Duration, NaiveDate};
use shared::models::{PricePoint, PriceSeries};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignMode {
    /// One series, passed through.
    Single,
    /// Dates present in every input; nothing is filled.
    Inner,
    /// Union of observed dates, forward-filled then back-filled.
    OuterFill,
    /// Daily calendar from the earliest to the latest date, linear interpolation
    /// of interior gaps, then forward-fill and back-fill at the edges.
    Interpolate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignedColumn {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignedFrame {
    dates: Vec<NaiveDate>,
    columns: Vec<AlignedColumn>,
}

impl AlignedFrame {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[AlignedColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.values.as_slice())
    }

    /// Rebuilds a named column as a price series on the frame's dates.
    pub fn series(&self, name: &str) -> Option<PriceSeries> {
        let values = self.column(name)?;
        let points = self
            .dates
            .iter()
            .zip(values)
            .map(|(d, v)| PricePoint::new(*d, *v))
            .collect();
        Some(PriceSeries::new(name, points))
    }
}

pub fn align(series: &[&PriceSeries], mode: AlignMode) -> EngineResult<AlignedFrame> {
    if series.is_empty() {
        return Err(EngineError::Alignment("no series to align".to_string()));
    }
    if let Some(empty) = series.iter().find(|s| s.is_empty()) {
        return Err(EngineError::Alignment(format!("series '{}' is empty", empty.symbol)));
    }

    let dates: Vec<NaiveDate> = match mode {
        AlignMode::Single => {
            if series.len() != 1 {
                return Err(EngineError::Alignment(format!(
                    "single mode takes exactly one series, got {}",
                    series.len()
                )));
            }
            series[0].dates()
        }
        AlignMode::Inner => {
            if series.len() < 2 {
                return Err(EngineError::Alignment("inner join needs at least two series".to_string()));
            }
            let mut common: BTreeSet<NaiveDate> = series[0].dates().into_iter().collect();
            for s in &series[1..] {
                let other: BTreeSet<NaiveDate> = s.dates().into_iter().collect();
                common.retain(|d| other.contains(d));
            }
            if common.is_empty() {
                return Err(EngineError::Alignment("inner join produced no common dates".to_string()));
            }
            common.into_iter().collect()
        }
        AlignMode::OuterFill => {
            let union: BTreeSet<NaiveDate> = series.iter().flat_map(|s| s.dates()).collect();
            union.into_iter().collect()
        }
        AlignMode::Interpolate => {
            let start = series.iter().filter_map(|s| s.first_date()).min();
            let end = series.iter().filter_map(|s| s.last_date()).max();
            match (start, end) {
                (Some(start), Some(end)) => daily_calendar(start, end),
                _ => return Err(EngineError::Alignment("cannot build a calendar from empty input".to_string())),
            }
        }
    };

    let mut columns = Vec::with_capacity(series.len());
    for s in series {
        let by_date: HashMap<NaiveDate, f64> = s.points().iter().map(|p| (p.date, p.close)).collect();
        let mut values: Vec<Option<f64>> = dates.iter().map(|d| by_date.get(d).copied()).collect();
        match mode {
            AlignMode::Single | AlignMode::Inner => {}
            AlignMode::OuterFill => {
                forward_fill(&mut values);
                back_fill(&mut values);
            }
            AlignMode::Interpolate => {
                interpolate_linear(&mut values);
                forward_fill(&mut values);
                back_fill(&mut values);
            }
        }
        let values = values
            .into_iter()
            .map(|v| v.ok_or_else(|| EngineError::Alignment(format!("unfilled gap in '{}'", s.symbol))))
            .collect::<EngineResult<Vec<f64>>>()?;
        columns.push(AlignedColumn {
            name: s.symbol.clone(),
            values,
        });
    }

    tracing::debug!(?mode, rows = dates.len(), columns = columns.len(), "Aligned series");
    Ok(AlignedFrame { dates, columns })
}

fn daily_calendar(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut day = start;
    while day <= end {
        dates.push(day);
        day += Duration::days(1);
    }
    dates
}

/// Fills gaps strictly between two known values; leading and trailing gaps are left alone.
fn interpolate_linear(values: &mut [Option<f64>]) {
    let known: Vec<(usize, f64)> = values.iter().enumerate().filter_map(|(i, v)| v.map(|x| (i, x))).collect();
    for pair in known.windows(2) {
        let (i, vi) = pair[0];
        let (j, vj) = pair[1];
        for k in (i + 1)..j {
            let frac = (k - i) as f64 / (j - i) as f64;
            values[k] = Some(vi + (vj - vi) * frac);
        }
    }
}

fn forward_fill(values: &mut [Option<f64>]) {
    let mut last = None;
    for v in values.iter_mut() {
        match v {
            Some(x) => last = Some(*x),
            None => *v = last,
        }
    }
}

fn back_fill(values: &mut [Option<f64>]) {
    let mut next = None;
    for v in values.iter_mut().rev() {
        match v {
            Some(x) => next = Some(*x),
            None => *v = next,
        }
    }
}
