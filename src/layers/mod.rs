pub mod linear;
pub mod lstm_cell;
