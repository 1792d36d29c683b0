pub mod quality_gate;
