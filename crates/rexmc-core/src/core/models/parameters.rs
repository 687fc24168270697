/// A bounded scalar sampled alongside the coordinates (for example a noise level).
#[derive(Debug, Clone, PartialEq)]
pub struct Nuisance {
    pub name: String,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Nuisance {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.upper)
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = self.clamp(value);
    }
}

/// Categorical weights over a set of states; the values always lie on the unit simplex.
#[derive(Debug, Clone, PartialEq)]
pub struct Weight {
    pub name: String,
    pub values: Vec<f64>,
}

impl Weight {
    pub fn number_of_states(&self) -> usize {
        self.values.len()
    }
}

/// Euclidean projection onto the probability simplex.
pub fn project_onto_simplex(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    let mut cumulative = 0.0;
    let mut theta = 0.0;
    for (i, &u) in sorted.iter().enumerate() {
        cumulative += u;
        let candidate = (cumulative - 1.0) / (i + 1) as f64;
        if u - candidate > 0.0 {
            theta = candidate;
        }
    }
    values.iter().map(|&v| (v - theta).max(0.0)).collect()
}
