pub mod forward_pass;
pub mod pass;
pub mod present_pass;
