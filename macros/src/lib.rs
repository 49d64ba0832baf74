use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, Ident, ItemFn, LitStr};

const USAGE: &str = "rxcell_macro::test only accepts: #[rxcell_macro::test], \
                     #[rxcell_macro::test(local)] or #[rxcell_macro::test(shared)]";

/// Marks a test function.
///
/// Synchronous tests expand to a plain `#[test]`. Async tests run on tokio:
/// `local` (the default) uses a current-thread runtime, `shared` a
/// multi-threaded one.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let input = parse_macro_input!(item as ItemFn);
  let args = proc_macro2::TokenStream::from(attr);

  if input.sig.asyncness.is_none() {
    if !args.is_empty() {
      return syn::Error::new(
        args.span(),
        "runtime flavors are only supported for async tests; use #[rxcell_macro::test] here",
      )
      .to_compile_error()
      .into();
    }
    return quote!(#[test] #input).into();
  }

  let flavor = match flavor_of(args) {
    Ok(flavor) => flavor,
    Err(err) => return err.to_compile_error().into(),
  };

  quote!(
    #[tokio::test(flavor = #flavor)]
    #input
  )
  .into()
}

fn flavor_of(args: proc_macro2::TokenStream) -> syn::Result<&'static str> {
  if args.is_empty() {
    return Ok("current_thread");
  }

  let (name, span) = if let Ok(ident) = syn::parse2::<Ident>(args.clone()) {
    (ident.to_string(), ident.span())
  } else if let Ok(lit) = syn::parse2::<LitStr>(args.clone()) {
    (lit.value(), lit.span())
  } else {
    return Err(syn::Error::new(args.span(), USAGE));
  };

  match name.as_str() {
    "local" => Ok("current_thread"),
    "shared" => Ok("multi_thread"),
    _ => Err(syn::Error::new(span, USAGE)),
  }
}
