mod http;
mod kv;

pub use self::http::{status_code, HttpResult, UrlError, ValidatedUrl, MAX_RESPONSE_BODY_SIZE};
pub use self::kv::{check_value_size, KvError, KvKey, KvResult};

pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

use crate::event::Event;
use crate::App;

/// Effect variants take their names from the field types: `Http`, `KeyValue`, `Render`.
#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub kv: KeyValue<Event>,
    pub render: Render<Event>,
}
