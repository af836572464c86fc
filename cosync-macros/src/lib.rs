//! Procedural macros re-exported by `cosync`.

mod utils;

use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Awaits several futures concurrently on the current task.
///
/// Evaluates to a tuple of their outputs, in argument order, once every
/// future has completed. A single argument evaluates to its output alone.
///
/// ```rust,ignore
/// let (a, b) = cosync::join!(first(), second());
/// ```
#[proc_macro]
pub fn join(input: TokenStream) -> TokenStream {
    let exprs: Vec<String> = utils::split_args(input)
        .iter()
        .map(|tokens| utils::tokens_to_string(tokens))
        .collect();

    let source = match exprs.as_slice() {
        [] => "()".to_owned(),
        [only] => format!("{{ ({only}).await }}"),
        many => join_source(many),
    };

    source.parse().unwrap_or_else(|err| {
        let msg = format!("join!: {err}");
        format!("compile_error!({msg:?});").parse().unwrap()
    })
}

/// Each slot is a pinned future plus the output it produced, polled until
/// every slot holds an output.
fn join_source(exprs: &[String]) -> String {
    let slots: String = exprs
        .iter()
        .enumerate()
        .map(|(i, expr)| {
            format!(
                "let mut __join{i} = (::std::boxed::Box::pin({expr}), \
                 ::core::option::Option::None);\n"
            )
        })
        .collect();

    let polls: String = (0..exprs.len())
        .map(|i| {
            format!(
                "if __join{i}.1.is_none() {{\n\
                     if let Poll::Ready(out) = __join{i}.0.as_mut().poll(cx) {{\n\
                         __join{i}.1 = ::core::option::Option::Some(out);\n\
                     }}\n\
                 }}\n"
            )
        })
        .collect();

    let ready = (0..exprs.len())
        .map(|i| format!("__join{i}.1.is_some()"))
        .collect::<Vec<_>>()
        .join(" && ");

    let outputs: String = (0..exprs.len())
        .map(|i| format!("__join{i}.1.take().unwrap(),"))
        .collect();

    format!(
        "{{\n\
         {slots}\
         ::std::future::poll_fn(move |cx| {{\n\
             use ::std::future::Future;\n\
             use ::std::task::Poll;\n\
             {polls}\
             if {ready} {{ Poll::Ready(({outputs})) }} else {{ Poll::Pending }}\n\
         }}).await\n\
         }}"
    )
}

/// Runs an `async fn main` on a runtime built for it.
///
/// Accepts `worker_threads = N`.
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    on_runtime(attr, item, false)
}

/// Turns an `async fn` into a `#[test]` that runs on its own runtime.
///
/// Accepts `worker_threads = N`.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    on_runtime(attr, item, true)
}

fn on_runtime(attr: TokenStream, item: TokenStream, is_test: bool) -> TokenStream {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let Some(body_at) = utils::strip_async(&mut tokens) else {
        return "compile_error!(\"expected an async fn with a body\");"
            .parse()
            .unwrap();
    };

    let TokenTree::Group(body) = &tokens[body_at] else {
        unreachable!("strip_async returns the position of a brace group");
    };

    let builder = utils::runtime_builder(attr);
    let wrapped = format!("{{ {builder}.block_on(async move {{ {} }}) }}", body.stream());

    tokens[body_at] = TokenTree::Group(Group::new(Delimiter::Brace, wrapped.parse().unwrap()));

    let mut output = TokenStream::new();
    if is_test {
        output.extend("#[test]".parse::<TokenStream>().unwrap());
    }
    output.extend(tokens);
    output
}
