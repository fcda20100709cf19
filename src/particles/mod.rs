pub mod deposit;
pub mod injection;
pub mod population;
pub mod pusher;
