use proc_macro::{Delimiter, TokenStream, TokenTree};

/// Splits macro input on top-level commas.
///
/// Commas nested in groups stay inside their group token, so only the
/// separators between arguments are seen here. Empty arguments (a trailing
/// comma) are dropped.
pub(crate) fn split_args(input: TokenStream) -> Vec<Vec<TokenTree>> {
    let mut args = Vec::new();
    let mut current = Vec::new();

    for token in input {
        match &token {
            TokenTree::Punct(p) if p.as_char() == ',' => args.push(std::mem::take(&mut current)),
            _ => current.push(token),
        }
    }

    args.push(current);
    args.retain(|arg| !arg.is_empty());
    args
}

/// Renders tokens back to source, keeping adjacent identifiers apart.
pub(crate) fn tokens_to_string(tokens: &[TokenTree]) -> String {
    let mut out = String::new();
    let mut after_ident = false;

    for token in tokens {
        let is_ident = matches!(token, TokenTree::Ident(_));

        if after_ident && is_ident {
            out.push(' ');
        }

        out.push_str(&token.to_string());
        after_ident = is_ident;
    }

    out
}

/// The `RuntimeBuilder` expression for a `main` or `test` attribute.
///
/// Only `worker_threads = N` is recognized; anything else keeps the
/// builder defaults.
pub(crate) fn runtime_builder(attr: TokenStream) -> String {
    let worker_threads = attr.to_string().split(',').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        (key.trim() == "worker_threads")
            .then(|| value.trim().parse::<usize>().ok())
            .flatten()
    });

    match worker_threads {
        Some(n) => format!("::cosync::RuntimeBuilder::new().worker_threads({n}).build()"),
        None => "::cosync::RuntimeBuilder::new().build()".to_owned(),
    }
}

/// Drops the `async` keyword and returns the index of the function body.
pub(crate) fn strip_async(tokens: &mut Vec<TokenTree>) -> Option<usize> {
    tokens.retain(|t| !matches!(t, TokenTree::Ident(id) if id.to_string() == "async"));

    tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))
}
