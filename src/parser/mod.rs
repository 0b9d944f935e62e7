pub mod blocks;
pub mod extract;
pub mod markup;
pub mod text;
