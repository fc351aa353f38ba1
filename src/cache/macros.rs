//! Cache macros for simplified caching.

/// Macro for defining cached async functions.
///
/// The generated function takes the [`Cache`](crate::cache::Cache) as its
/// first argument. Results are looked up under `"<name>:<key>"` and stored
/// after a miss; the wrapped body only runs on a miss. Cache failures are
/// returned through `?`, so the error type must implement
/// `From<CacheError>`.
///
/// # Usage
///
/// ```ignore
/// cached! {
///     name = "profile",
///     ttl = 60,
///     key = |user_id: &u64| user_id,
///     pub async fn load_profile(cache: &Cache, user_id: u64) -> Result<Profile, ProfileError> {
///         profiles.fetch(user_id).await
///     }
/// }
/// ```
///
/// # Parameters
///
/// - `name`: A unique name for this cache (used as prefix for cache keys)
/// - `ttl` (optional): Time-to-live in seconds, otherwise the cache default
/// - `key`: A closure-like expression over references to the arguments
/// - `async fn`: The async function definition
#[macro_export]
macro_rules! cached {
    (
        name = $cache_name:literal,
        $(ttl = $ttl:expr,)?
        key = |$($key_arg:ident : $key_ty:ty),* $(,)?| $key_expr:expr,
        $vis:vis async fn $fn_name:ident($cache_param:ident : &Cache $(, $arg:ident : $arg_ty:ty)* $(,)?) -> Result<$ok_ty:ty, $err_ty:ty> $body:block
    ) => {
        $vis async fn $fn_name(
            $cache_param: &$crate::cache::Cache,
            $($arg: $arg_ty),*
        ) -> Result<$ok_ty, $err_ty> {
            let cache_key = {
                $(let $key_arg: $key_ty = &$arg;)*
                format!("{}:{}", $cache_name, $key_expr)
            };

            if let Some(cached_value) = $cache_param.get_as::<$ok_ty>(&cache_key).await? {
                return Ok(cached_value);
            }

            let result: Result<$ok_ty, $err_ty> = (async $body).await;
            let value = result?;

            let options = $crate::cache::Options::new()$(.with_ttl($crate::cache::Ttl::Seconds($ttl)))?;
            $cache_param.set_with(&cache_key, &value, &options).await?;
            Ok(value)
        }
    };
}
