pub mod assets;
pub mod composite;
pub mod format;
pub mod handler;
pub mod layout;
pub mod models;
pub mod renderer;
pub mod source;
mod text;

pub use handler::create_card_router;
pub use models::{
    AvatarSource, BackgroundSource, CardColor, CardColors, ImageStream, RankCardRequest,
    RankStats, RenderOptions, RenderRequest, StreamMode,
};
pub use renderer::{CardRenderer, compose_canvas, compose_card, decode_image, encode_png};
