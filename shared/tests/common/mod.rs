#![allow(dead_code)]

use crux_core::testing::AppTester;
use crux_core::Request;
use crux_http::protocol::{HttpRequest, HttpResponse, HttpResult};
use crux_kv::error::KeyValueError;
use crux_kv::value::Value;
use crux_kv::{KeyValueOperation, KeyValueResponse, KeyValueResult};
use shared::{App, Effect, Event, Model};

pub type Tester = AppTester<App, Effect>;

pub const SE_BODY: &str = r#"{"cep":"01001-000","logradouro":"Praça da Sé","complemento":"lado ímpar",
    "bairro":"Sé","localidade":"São Paulo","uf":"SP","ibge":"3550308","ddd":"11"}"#;

pub fn kv_requests(effects: Vec<Effect>) -> Vec<Request<KeyValueOperation>> {
    effects
        .into_iter()
        .filter_map(|e| match e {
            Effect::KeyValue(request) => Some(request),
            _ => None,
        })
        .collect()
}

pub fn http_requests(effects: Vec<Effect>) -> Vec<Request<HttpRequest>> {
    effects
        .into_iter()
        .filter_map(|e| match e {
            Effect::Http(request) => Some(request),
            _ => None,
        })
        .collect()
}

pub fn renders(effects: &[Effect]) -> bool {
    effects.iter().any(|e| matches!(e, Effect::Render(_)))
}

/// The bytes a `Set` request carries, if it is one.
pub fn written_value(request: &Request<KeyValueOperation>) -> Option<&[u8]> {
    match &request.operation {
        KeyValueOperation::Set { value, .. } => Some(value),
        _ => None,
    }
}

pub fn header<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
    request
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

pub fn stored(bytes: Option<Vec<u8>>) -> KeyValueResult {
    KeyValueResult::Ok {
        response: KeyValueResponse::Get {
            value: Value::from(bytes),
        },
    }
}

pub fn written() -> KeyValueResult {
    KeyValueResult::Ok {
        response: KeyValueResponse::Set {
            previous: Value::None,
        },
    }
}

pub fn storage_failed(message: &str) -> KeyValueResult {
    KeyValueResult::Err {
        error: KeyValueError::Io {
            message: message.to_string(),
        },
    }
}

pub fn lookup_ok(body: &str) -> HttpResult {
    HttpResult::Ok(HttpResponse::ok().body(body.as_bytes().to_vec()).build())
}

pub fn lookup_status(status: u16) -> HttpResult {
    HttpResult::Ok(HttpResponse::status(status).build())
}

/// Resolves a request and feeds the resulting events back, returning their effects.
pub fn resolve_kv(
    app: &Tester,
    model: &mut Model,
    request: &mut Request<KeyValueOperation>,
    output: KeyValueResult,
) -> Vec<Effect> {
    let update = app.resolve(request, output).expect("kv request resolves");
    let mut effects = Vec::new();
    for event in update.events {
        effects.extend(app.update(event, model).effects);
    }
    effects
}

pub fn resolve_http(
    app: &Tester,
    model: &mut Model,
    request: &mut Request<HttpRequest>,
    output: HttpResult,
) -> Vec<Effect> {
    let update = app.resolve(request, output).expect("http request resolves");
    let mut effects = Vec::new();
    for event in update.events {
        effects.extend(app.update(event, model).effects);
    }
    effects
}

/// Starts the app against an empty slot.
pub fn started(app: &Tester) -> Model {
    let mut model = Model::default();
    let update = app.update(Event::AppStarted, &mut model);
    let mut requests = kv_requests(update.effects);
    assert_eq!(requests.len(), 1);
    resolve_kv(app, &mut model, &mut requests[0], stored(None));
    assert!(model.is_loaded);
    model
}

/// Opens the create form, runs a successful lookup and submits with `number`.
pub fn create_visit(app: &Tester, model: &mut Model, body: &str, cep: &str, number: &str) {
    app.update(Event::OpenCreateForm, model);

    let update = app.update(
        Event::PostalCodeChanged {
            value: cep.to_string(),
        },
        model,
    );
    let mut lookups = http_requests(update.effects);
    assert_eq!(lookups.len(), 1);
    resolve_http(app, model, &mut lookups[0], lookup_ok(body));

    app.update(
        Event::FieldChanged {
            field: shared::form::FormField::Number,
            value: number.to_string(),
        },
        model,
    );
    let update = app.update(Event::SubmitForm, model);
    assert_eq!(kv_requests(update.effects).len(), 1, "submit persists");
    assert!(model.form.is_none());
}
