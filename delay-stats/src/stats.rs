use itertools::{
    Itertools,
    MinMaxResult::{MinMax, NoElements, OneElement},
};
use std::fmt::Display;

fn select(data: &mut [f64], k: usize) -> Option<f64> {
    if k < data.len() {
        let (_, kth, _) = data.select_nth_unstable_by(k, f64::total_cmp);
        Some(*kth)
    } else {
        None
    }
}

fn median(data: &[f64]) -> Option<f64> {
    let mut data = data.to_vec();
    match data.len() {
        0 => None,
        even if even % 2 == 0 => {
            let fst = select(&mut data, even / 2 - 1)?;
            let snd = select(&mut data, even / 2)?;
            Some((fst + snd) / 2.0)
        }
        odd => select(&mut data, odd / 2),
    }
}

/// Statistics of the finite values of a delay map
#[derive(Debug, Clone, PartialEq)]
pub struct DelayStats {
    pub name: String,
    /// Number of values, finite or not
    pub size: usize,
    values: Vec<f64>,
}
impl DelayStats {
    pub fn new<S: Into<String>>(name: S, data: impl IntoIterator<Item = f64>) -> Self {
        let mut size = 0;
        let values = data
            .into_iter()
            .inspect(|_| size += 1)
            .filter(|x| x.is_finite())
            .collect();
        Self {
            name: name.into(),
            size,
            values,
        }
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.values.iter().sum::<f64>() / self.len() as f64)
        }
    }
    pub fn median(&self) -> Option<f64> {
        median(&self.values)
    }
    pub fn minmax(&self) -> Option<(f64, f64)> {
        match self.values.iter().cloned().minmax_by(f64::total_cmp) {
            MinMax(min, max) => Some((min, max)),
            OneElement(x) => Some((x, x)),
            NoElements => None,
        }
    }
}
impl Display for DelayStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} [{}/{}]:", self.name, self.len(), self.size)?;
        self.mean()
            .map(|x| writeln!(f, " - mean  : {:.4}m", x))
            .transpose()?;
        self.median()
            .map(|x| writeln!(f, " - median: {:.4}m", x))
            .transpose()?;
        match self.minmax() {
            Some(x) => write!(f, " - minmax: {:.4?}m", x),
            None => write!(f, " - minmax: n/a"),
        }
    }
}
