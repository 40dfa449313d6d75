pub mod comms;
