use proc_macro::TokenStream;

extern crate proc_macro;

mod signup_handler;

/// Registers an `ISignupHandler` impl under a module name at load time.
#[proc_macro_attribute]
#[allow(non_snake_case)]
pub fn SignupHandler(attr: TokenStream, item: TokenStream) -> TokenStream {
    signup_handler::signup_handler(attr, item)
}
