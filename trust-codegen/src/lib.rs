use proc_macro::TokenStream;
use quote::{format_ident, quote, quote_spanned};
use syn::spanned::Spanned;

/// Turns `async fn name(server: &TestServer, trust: &Trust)` into a tokio test
/// running against a fresh fixture server.
///
/// An optional path argument names a `fn(&TestServer)` that prepares the
/// fixture before the body runs: `#[trust_test(serve_array)]`.
#[proc_macro_attribute]
pub fn trust_test(attrs: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as syn::ItemFn);
    let args = syn::parse_macro_input!(attrs as syn::AttributeArgs);

    if args.len() > 1 {
        return quote! {
            compile_error!("trust_test accepts at most one configuration function");
        }
        .into();
    }

    let configure = match args.first() {
        None => None,
        Some(syn::NestedMeta::Meta(syn::Meta::Path(function_path))) => Some(function_path),
        Some(other) => {
            return quote_spanned! {other.span()=>
                compile_error!("The argument should be a configuration function!");
            }
            .into();
        }
    };

    if let Err(stream) = validate_signature(&input.sig) {
        return stream.into();
    }

    let attributes = &input.attrs;
    let name = &input.sig.ident;
    let body_name = format_ident!("__trust_test_{}", name);
    let mut body_fn = input.clone();
    body_fn.attrs.clear();
    body_fn.sig.ident = body_name.clone();

    let configure_call = configure.map(|function_path| {
        quote! { #function_path(&__trust_server); }
    });

    let output = quote! {
        #(#attributes)*
        #[::tokio::test]
        async fn #name() {
            #body_fn

            ::trust_tests::init_tracing();

            let __trust_server = ::trust_tests::TestServer::start()
                .await
                .expect("Couldn't start the fixture server");
            #configure_call
            let __trust = ::trust::create(__trust_server.url());

            let __trust_result = ::futures::FutureExt::catch_unwind(
                ::std::panic::AssertUnwindSafe(#body_name(&__trust_server, &__trust)),
            )
            .await;

            drop(__trust);
            let __trust_stopped = __trust_server.stop().await;

            if let Err(e) = __trust_result {
                ::std::panic::resume_unwind(e);
            }
            if let Err(e) = __trust_stopped {
                panic!("Fixture server error: {}", e);
            }
        }
    };

    TokenStream::from(output)
}

fn validate_signature(signature: &syn::Signature) -> Result<(), proc_macro2::TokenStream> {
    if signature.asyncness.is_none() {
        return Err(quote_spanned! {signature.fn_token.span=>
            compile_error!("trust_test functions should be async!");
        });
    }

    if signature.inputs.len() != 2 {
        return Err(quote_spanned! {signature.inputs.span()=>
            compile_error!("trust_test functions should take (&TestServer, &Trust)!");
        });
    }

    Ok(())
}
