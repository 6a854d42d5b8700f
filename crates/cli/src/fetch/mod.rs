//! HTTP adapters for the pipeline's collaborators.
//!
//! | Adapter          | Trait              | Upstream                       |
//! |------------------|--------------------|--------------------------------|
//! | `FirecrawlClient`| `PageFetcher`      | Firecrawl `/v0/scrape`         |
//! | `ChatExtractor`  | `ContentExtractor` | OpenAI-compatible chat API     |
//! | `HunterClient`   | `ContactLookup`    | Hunter `/v2/domain-search`     |
//! | `SupabaseStore`  | `PersistenceSink`  | Supabase PostgREST             |

mod common;
mod firecrawl;
mod hunter;
mod openai;
mod supabase;

pub(crate) use common::truncate_chars;
pub use firecrawl::FirecrawlClient;
pub use hunter::HunterClient;
pub use openai::ChatExtractor;
pub use supabase::SupabaseStore;
