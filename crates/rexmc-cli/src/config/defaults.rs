pub struct DefaultsConfig {
    pub temperature: f64,
    pub self_adaptive: bool,
    pub num_frames: u64,
    pub steps_per_frame: usize,
    pub seed: u64,
    pub num_replicas: usize,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub annealing_min_time: u64,
    pub annealing_max_time: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            self_adaptive: false,
            num_frames: 1000,
            steps_per_frame: 10,
            seed: 0,
            num_replicas: 1,
            min_temperature: 1.0,
            max_temperature: 2.5,
            annealing_min_time: 100,
            annealing_max_time: 200,
        }
    }
}
