use proc_macro::TokenStream;
use quote::{format_ident, quote};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use syn::punctuated::Punctuated;
use syn::{Expr, ExprLit, ItemImpl, Lit, Meta, Token, parse_macro_input};

const USAGE: &str =
    "Expected #[SignupHandler(name = \"module\")] or #[SignupHandler(name = \"module\", factory)]";

fn hash_type_name(ty: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    ty.hash(&mut hasher);
    hasher.finish()
}

struct HandlerArgs {
    name: String,
    factory: bool,
}

fn parse_args(metas: Punctuated<Meta, Token![,]>) -> HandlerArgs {
    let mut name = None;
    let mut factory = false;

    for meta in metas {
        match meta {
            Meta::Path(path) if path.is_ident("factory") => factory = true,
            Meta::NameValue(nv) if nv.path.is_ident("name") => match nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(lit), ..
                }) => name = Some(lit.value()),
                _ => panic!("{USAGE}"),
            },
            _ => panic!("{USAGE}"),
        }
    }

    let Some(name) = name else {
        panic!("{USAGE}");
    };

    HandlerArgs { name, factory }
}

pub fn signup_handler(attr: TokenStream, item: TokenStream) -> TokenStream {
    let metas = parse_macro_input!(attr with Punctuated::<Meta, Token![,]>::parse_terminated);
    let args = parse_args(metas);

    let input = parse_macro_input!(item as ItemImpl);
    let self_ty = &input.self_ty;

    if input.trait_.is_none() {
        panic!("Expected `impl ISignupHandler for ...`");
    }

    let type_name = quote!(#self_ty).to_string();
    let hash = hash_type_name(&format!("{}::{}", args.name, type_name));
    let sanitized: String = type_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let fn_name = format_ident!("__register_signup_handler_{}_{}", sanitized, hash);

    let module_name = args.name;
    let factory_expr = if args.factory {
        quote! {
            || <#self_ty as ::signup_hook::core::factory::SignupHandlerProvidesFactory<#self_ty>>::factory()
        }
    } else {
        quote! {
            || async {
                Ok::<_, ::signup_hook::core::contracts::BoxError>(
                    <#self_ty as ::core::default::Default>::default(),
                )
            }
        }
    };

    let expanded = quote! {
        #input

        #[doc(hidden)]
        #[::ctor::ctor]
        fn #fn_name() {
            let _ = ::signup_hook::core::registry::handler::<#self_ty, _, _>(#module_name, #factory_expr);
        }
    };

    TokenStream::from(expanded)
}
