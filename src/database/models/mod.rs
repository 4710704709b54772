pub mod card;
pub mod robot;

pub use card::Card;
pub use robot::Robot;
