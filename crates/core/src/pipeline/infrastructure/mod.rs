pub mod channel_observer;
