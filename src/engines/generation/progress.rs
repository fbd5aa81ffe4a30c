use super::evolution_engine::ProgressCallback;

/// Reports generation progress through the `log` facade.
pub struct ConsoleProgressCallback;

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        log::debug!("Generation {} starting...", generation + 1);
    }

    fn on_generation_complete(
        &mut self,
        generation: usize,
        best_fitness: f64,
        best_size: usize,
        hof_size: usize,
    ) {
        log::info!(
            "Generation {} complete. Best fitness: {:.4}, program size: {}, Hall of Fame size: {}",
            generation + 1,
            best_fitness,
            best_size,
            hof_size
        );
    }
}
