use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, GenericArgument, Ident, ItemFn, Pat, PathArguments,
    Signature, Type,
};

/// Transform an asynchronous test into a synchronous one running against a
/// fresh database, inject dependencies, and ensure that the database is
/// dropped regardless of how the test terminates.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// [`mongodb::Database`], and `crate::model::mongodb::Coll<T>`, in any order.
///
/// Requires `crate::db_client`, `crate::database` and `crate::rocket_for_db`
/// to be in scope.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    if !args.is_empty() {
        return syn::Error::new(
            TokenStream2::from(args).span(),
            "`backend_test` does not take arguments",
        )
        .into_compile_error()
        .into();
    }

    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let injected = match check_sig(&item_fn.sig) {
        Ok(injected) => injected,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };
    let collections = injected.iter().filter_map(|arg| match arg {
        Injected::Collection(ident, ty) => Some(quote! {
            let #ident = crate::model::mongodb::Coll::<#ty>::from_db(&db);
        }),
        _ => None,
    });
    let call_args = injected.iter().map(|arg| match arg {
        Injected::Client => quote! { rocket_client },
        Injected::Database => quote! { db },
        Injected::Collection(ident, _) => quote! { #ident },
    });

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup() -> (rocket::local::asynchronous::Client, mongodb::Database) {
                let db_client = crate::db_client().await;
                let db_name = crate::database();
                let rocket = crate::rocket_for_db(db_client.clone(), &db_name)
                    .await
                    .unwrap();
                let rocket_client = rocket::local::asynchronous::Client::tracked(rocket)
                    .await
                    .unwrap();
                let db = db_client.database(&db_name);

                (rocket_client, db)
            }

            /// The test itself.
            #item_fn

            /// Test cleanup.
            async fn cleanup(db: mongodb::Database) {
                db.drop(None).await.unwrap();
            }

            // Create an async runtime. We need a separate one for inside and
            // outside the `catch_unwind`.
            let outer_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("test-setup-cleanup")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();
            let inner_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            // Run the setup.
            let (rocket_client, db) = outer_runtime.block_on(setup());

            // Run the test, catching any panics.
            // Use mutexes to safely transfer `!UnwindSafe` data.
            let client_mutex = std::sync::Mutex::new(rocket_client);
            let db_mutex = std::sync::Mutex::new(db.clone());
            let runtime_mutex = std::sync::Mutex::new(inner_runtime);
            let result = std::panic::catch_unwind(|| {
                #[allow(unused_variables)]
                let rocket_client = client_mutex.into_inner().unwrap();
                #[allow(unused_variables)]
                let db = db_mutex.into_inner().unwrap();
                let runtime = runtime_mutex.into_inner().unwrap();

                #(#collections)*

                runtime.block_on(#new_name(#(#call_args),*));
            });

            // Run the cleanup.
            outer_runtime.block_on(cleanup(db));

            // If the test panicked, re-raise the panic.
            if let Err(cause) = result {
                std::panic::resume_unwind(cause);
            }
        }
    }
    .into()
}

/// A dependency to inject into the test, in signature order.
enum Injected {
    Client,
    Database,
    Collection(Ident, Ident),
}

/// Ensure the wrapped test is async, work out what to inject, and reject unknown parameters.
fn check_sig(sig: &Signature) -> Result<Vec<Injected>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut injected = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(pat_ident), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty)
            {
                if let Some(type_ident) = type_path.path.get_ident() {
                    let arg = if type_ident == "Client" {
                        Injected::Client
                    } else if type_ident == "Database" {
                        Injected::Database
                    } else {
                        return Err(unexpected(input));
                    };
                    if injected
                        .iter()
                        .any(|other| std::mem::discriminant(other) == std::mem::discriminant(&arg))
                    {
                        return Err(syn::Error::new(
                            input.span(),
                            format!("Test cannot accept more than one `{type_ident}`"),
                        ));
                    }
                    injected.push(arg);
                    continue;
                }

                // Valid as the last path segment for any type is itself.
                if let Some(possible_collection) = type_path.path.segments.last() {
                    if possible_collection.ident == "Coll" {
                        if let PathArguments::AngleBracketed(generics) =
                            &possible_collection.arguments
                        {
                            if let Some(GenericArgument::Type(Type::Path(inner))) =
                                generics.args.first()
                            {
                                if let Some(inner_ident) = inner.path.get_ident() {
                                    injected.push(Injected::Collection(
                                        pat_ident.ident.clone(),
                                        inner_ident.clone(),
                                    ));
                                    continue;
                                }
                            }
                        }
                    }
                }
            }
        }

        return Err(unexpected(input));
    }

    Ok(injected)
}

fn unexpected(input: &FnArg) -> syn::Error {
    syn::Error::new(
        input.span(),
        "Expected one of `client_ident: Client`, `db_ident: Database` or `collection_ident: Coll<T>`",
    )
}
