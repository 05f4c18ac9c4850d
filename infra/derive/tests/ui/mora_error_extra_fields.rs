use mora_derive::mora_error;
use std::borrow::Cow;

// `Call` carries more than `source` + `context`, so no `From<io::Error>` is generated
// for it and `Io` keeps that conversion without a conflict.
#[mora_error]
pub enum DemoError {
    #[error("Call `{call}` failed{}: {source}", format_context(.context))]
    Call { call: Cow<'static, str>, source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("IO error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },
}

fn main() {
    let err: DemoError = std::io::Error::other("boom").into();
    assert_eq!(err.variant_name(), "Io");

    let call = DemoError::Call {
        call: "list".into(),
        source: std::io::Error::other("down"),
        context: None,
    };
    assert_eq!(call.variant_name(), "Call");
}
