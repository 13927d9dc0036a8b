use fxhash::FxHashSet;
use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::Parser;
use syn::{Attribute, ItemFn, ItemStruct, Lit, LitBool, LitStr, Meta, MetaNameValue};

/// Expands the `#[api_model]` attribute macro.
///
/// Adds the serde/OpenAPI derives and the camelCase + strict-field serde policy.
pub fn expand_api_model(args: TokenStream, input: ItemStruct) -> TokenStream {
    let expanded = parse_api_model_args(args).and_then(|args| {
        let derives = derived_trait_names(&input.attrs);
        let serde_meta = serde_meta_info(&input.attrs)?;
        let rename = rename_attr(args.rename_all, &serde_meta)?;
        let deny = deny_unknown_attr(args.deny_unknown_fields, &serde_meta, &input)?;
        let derive = derive_attr(&derives);
        let to_schema = if derives.contains("ToSchema") {
            quote! {}
        } else {
            quote! { #[cfg_attr(feature = "server", derive(::utoipa::ToSchema))] }
        };

        Ok(quote! {
            #derive
            #to_schema
            #rename
            #deny
            #input
        })
    });

    expanded.unwrap_or_else(|err| err)
}

/// Expands the `#[api_handler]` attribute macro.
pub fn expand_api_handler(args: TokenStream, input: ItemFn) -> TokenStream {
    let ItemFn { attrs, vis, sig, block } = &input;

    quote! {
        #(#attrs)*
        #[allow(clippy::unused_async)]
        #[cfg_attr(feature = "server", ::utoipa::path(#args))]
        #vis #sig #block
    }
}

#[derive(Default)]
struct ApiModelArgs {
    rename_all: Option<LitStr>,
    deny_unknown_fields: Option<bool>,
}

struct SerdeMetaInfo {
    rename_all: Option<LitStr>,
    deny_unknown_fields: bool,
}

fn parse_api_model_args(args: TokenStream) -> Result<ApiModelArgs, TokenStream> {
    let parser = syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated;
    let metas = parser.parse2(args).map_err(|err| err.to_compile_error())?;
    let mut parsed = ApiModelArgs::default();

    for meta in metas {
        let name_value = match meta {
            Meta::NameValue(name_value) => name_value,
            other => {
                return Err(spanned_error(
                    other,
                    "Expected name-value arguments like `rename_all = \"...\"`",
                ));
            }
        };

        if name_value.path.is_ident("rename_all") {
            let Lit::Str(lit) = literal(&name_value)? else {
                return Err(spanned_error(&name_value.value, "rename_all must be a string literal"));
            };
            set_once(&mut parsed.rename_all, &name_value, lit)?;
        } else if name_value.path.is_ident("deny_unknown_fields") {
            let Lit::Bool(LitBool { value, .. }) = literal(&name_value)? else {
                return Err(spanned_error(
                    &name_value.value,
                    "deny_unknown_fields must be a boolean literal",
                ));
            };
            set_once(&mut parsed.deny_unknown_fields, &name_value, value)?;
        } else {
            return Err(spanned_error(
                &name_value.path,
                "Unsupported argument; expected rename_all or deny_unknown_fields",
            ));
        }
    }

    Ok(parsed)
}

fn literal(name_value: &MetaNameValue) -> Result<Lit, TokenStream> {
    match &name_value.value {
        syn::Expr::Lit(expr_lit) => Ok(expr_lit.lit.clone()),
        other => Err(spanned_error(other, "Expected a literal value")),
    }
}

fn set_once<T>(slot: &mut Option<T>, token: &MetaNameValue, value: T) -> Result<(), TokenStream> {
    if slot.is_some() {
        return Err(spanned_error(token, "Duplicate argument"));
    }
    *slot = Some(value);
    Ok(())
}

fn spanned_error(tokens: impl quote::ToTokens, message: &str) -> TokenStream {
    syn::Error::new_spanned(tokens, message).to_compile_error()
}

fn derive_attr(derives: &FxHashSet<String>) -> TokenStream {
    let missing = [
        ("Debug", quote! { Debug }),
        ("Serialize", quote! { ::serde::Serialize }),
        ("Deserialize", quote! { ::serde::Deserialize }),
    ]
    .into_iter()
    .filter(|(name, _)| !derives.contains(*name))
    .map(|(_, tokens)| tokens)
    .collect::<Vec<_>>();

    if missing.is_empty() { quote! {} } else { quote! { #[derive(#(#missing),*)] } }
}

fn rename_attr(
    rename_all: Option<LitStr>,
    serde_meta: &SerdeMetaInfo,
) -> Result<TokenStream, TokenStream> {
    let wanted =
        rename_all.unwrap_or_else(|| LitStr::new("camelCase", proc_macro2::Span::call_site()));

    match &serde_meta.rename_all {
        Some(existing) if existing.value() != wanted.value() => Err(spanned_error(
            existing,
            "Conflicting serde rename_all; remove it or set api_model(rename_all = \"...\") to match",
        )),
        Some(_) => Ok(quote! {}),
        None => Ok(quote! { #[serde(rename_all = #wanted)] }),
    }
}

fn deny_unknown_attr(
    deny_unknown_fields: Option<bool>,
    serde_meta: &SerdeMetaInfo,
    input: &ItemStruct,
) -> Result<TokenStream, TokenStream> {
    let deny_unknown = deny_unknown_fields.unwrap_or(true);
    match (serde_meta.deny_unknown_fields, deny_unknown) {
        (true, false) => Err(spanned_error(
            &input.ident,
            "deny_unknown_fields is already set via serde; remove it before disabling",
        )),
        (true, true) | (false, false) => Ok(quote! {}),
        (false, true) => Ok(quote! { #[serde(deny_unknown_fields)] }),
    }
}

fn serde_meta_info(attrs: &[Attribute]) -> Result<SerdeMetaInfo, TokenStream> {
    let mut info = SerdeMetaInfo { rename_all: None, deny_unknown_fields: false };

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                info.rename_all = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("deny_unknown_fields") {
                info.deny_unknown_fields = true;
            }
            Ok(())
        })
        .map_err(|err| err.to_compile_error())?;
    }

    Ok(info)
}

fn derived_trait_names(attrs: &[Attribute]) -> FxHashSet<String> {
    let mut traits = FxHashSet::default();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("derive")) {
        let _ = attr.parse_nested_meta(|meta| {
            if let Some(segment) = meta.path.segments.last() {
                traits.insert(segment.ident.to_string());
            }
            Ok(())
        });
    }

    traits
}
