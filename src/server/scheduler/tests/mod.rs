mod schedule;
mod scheduler;
