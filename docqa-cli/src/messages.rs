//! User-facing message catalogue (Traditional Chinese).

pub const ERROR_NO_FILES: &str = "請先選擇至少一個文件。";
pub const ERROR_NO_TOKEN: &str = "請輸入 HuggingFace Token。";
pub const ERROR_NO_DATABASE: &str = "請先建立或載入向量資料庫。";
pub const ERROR_CREATE_DB: &str = "❌ 建立資料庫時出錯：";
pub const ERROR_LOAD_DB: &str = "❌ 載入資料庫時出錯：";
pub const ERROR_SAVE_DB: &str = "❌ 保存資料庫時出錯：";
pub const ERROR_QUERY: &str = "❌ 執行查詢時出錯：";
pub const ERROR_EMPTY_QUERY: &str = "⚠️ 請輸入問題。";
pub const ERROR_READ_FILE: &str = "❌ 讀取文件時出錯：";

pub const SUCCESS_DB_CREATED: &str = "✅ 向量資料庫建立成功！";
pub const SUCCESS_DB_SAVED: &str = "✅ 資料庫已保存！";
pub const SUCCESS_DB_LOADED: &str = "✅ 資料庫載入成功！";

pub const WARNING_NO_API_KEY: &str = "⚠️ 未設定 GOOGLE_API_KEY，無法生成答案。";
pub const WARNING_DB_NOT_READY: &str = "⚠️ 請先建立向量資料庫。";
pub const WARNING_NO_DOCUMENTS: &str = "ℹ️ 未檢索到相關文件片段。";

pub const INFO_NO_DB_FOUND: &str = "ℹ️ 未找到已保存的資料庫。請先建立新資料庫。";
pub const INFO_DB_READY: &str = "✅ 資料庫已準備好進行查詢";
pub const INFO_LOAD_EXISTING: &str = "ℹ️ 資料庫未準備好，請先建立或載入。";

pub const HEADING_ANSWER: &str = "🤖 最終答案";
pub const HEADING_CONTEXT: &str = "📚 檢索到的文件片段 (Context)";
pub const UNKNOWN_SOURCE: &str = "未知文件";

pub const SHELL_BANNER: &str = "📚 RAG 文件問答系統";
pub const SHELL_HELP: &str = "\
輸入問題即可提問。指令：
  /build <文件...>   上傳文件並建立向量資料庫
  /save [目錄]       保存資料庫
  /load [目錄]       載入已保存的資料庫
  /status            資料庫狀態
  /config            顯示目前配置
  /help              顯示此說明
  /quit              離開";
pub const SHELL_UNKNOWN_COMMAND: &str = "⚠️ 未知指令，輸入 /help 查看可用指令。";
pub const SHELL_GOODBYE: &str = "👋 再見！";
