mod calculate_sweep_interval;
