pub mod measure_filters;
