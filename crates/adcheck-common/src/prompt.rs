/// Prompt profiles: instruction text plus target model, selected by configuration.
///
/// All domain rules (walking-time convention, operating-business checks, superlative
/// substantiation) live in the instruction text because the reviewing happens remotely.
use serde::Serialize;

const AD_TEXT_SLOT: &str = "{ad_text}";
const EVIDENCE_SLOT: &str = "{evidence_text}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptProfile {
    pub name: String,
    pub model: String,
    pub system_instruction: String,
    /// Must contain `{ad_text}` and `{evidence_text}`.
    pub user_template: String,
}

impl PromptProfile {
    pub fn standard() -> Self {
        Self {
            name: "standard".to_string(),
            model: "gemini-2.5-flash".to_string(),
            system_instruction: format!("{STANDARD_ROLE}{REVIEW_RULES}{SCHEMA_WITH_SOURCE}"),
            user_template: STANDARD_USER_TEMPLATE.to_string(),
        }
    }

    pub fn quick() -> Self {
        Self {
            name: "quick".to_string(),
            model: "gemini-2.5-flash-lite".to_string(),
            system_instruction: format!("{QUICK_ROLE}{REVIEW_RULES}{SCHEMA_WITHOUT_SOURCE}"),
            user_template: QUICK_USER_TEMPLATE.to_string(),
        }
    }

    pub fn detailed() -> Self {
        Self {
            name: "detailed".to_string(),
            model: "gemini-2.5-pro".to_string(),
            system_instruction: format!(
                "{STANDARD_ROLE}{REVIEW_RULES}{DETAILED_RULES}{SCHEMA_WITHOUT_SOURCE}"
            ),
            user_template: STANDARD_USER_TEMPLATE.to_string(),
        }
    }

    pub fn builtin_names() -> &'static [&'static str] {
        &["standard", "quick", "detailed"]
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(Self::standard()),
            "quick" => Some(Self::quick()),
            "detailed" => Some(Self::detailed()),
            _ => None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Interpolate ad and evidence text into the user template.
    ///
    /// Only placeholders from the template itself are substituted; braces inside the
    /// user's own text are left alone.
    pub fn render_user_text(&self, ad_text: &str, evidence_text: &str) -> String {
        self.user_template
            .split(AD_TEXT_SLOT)
            .map(|piece| piece.replace(EVIDENCE_SLOT, evidence_text))
            .collect::<Vec<_>>()
            .join(ad_text)
    }
}

const STANDARD_ROLE: &str = "\
あなたは大手不動産会社の「マーケティング部・広告審査課」に所属する、熟練のコンプライアンス担当者です。
提出された「エビデンス（Excel）」と「デザイン案（AIデータ/画像/PDF）」を照合し、不動産表示の公正競争規約に基づき校閲してください。
";

const QUICK_ROLE: &str = "\
あなたは不動産広告の審査担当者です。
物件原本データと広告案を照合し、不動産の表示に関する公正競争規約に照らして問題点を簡潔に指摘してください。
";

const REVIEW_RULES: &str = "
【厳守すべき校閲ルール】
1. 地図および周辺施設:
   - Google Mapsを活用し、物件の所在地、周辺施設が「現時点で存在するか」「名称が正しいか」を検証してください。
   - 閉店した店舗が掲載されている場合は「修正要」と判定してください。
2. 徒歩時間の再計算:
   - 実際の道路距離を測定し、「80m=1分（端数切り上げ）」で算出されているか確認してください。
3. 特定用語の制限:
   - 「日本一」「最高」「格安」「完売」等の表現には、客観的な根拠（出典・調査日）の併記が必要です。
   - 根拠が示されていない場合は削除または根拠の併記を修正案として提示してください。
";

const DETAILED_RULES: &str = "
【追加確認事項】
4. 価格・面積・築年月など数値の記載が物件原本データと一致しているか、一項目ずつ確認してください。
5. 二重価格表示や「今だけ」等の期間限定表現は、根拠となる期間・条件が明記されているか確認してください。
";

const SCHEMA_WITH_SOURCE: &str = r#"
【出力形式】
必ずJSON形式で回答してください。JSON以外のテキストを含めないでください。
{
  "results": [
    {
      "item": "項目名",
      "originalContent": "制作物上の記載",
      "factCheckResult": "事実照合結果（具体的な根拠を記載）",
      "judgment": "PASS" | "WARNING" | "FAIL",
      "suggestion": "具体的な修正案",
      "source": "根拠資料名"
    }
  ],
  "revisedAdCopy": "規約に準拠した修正後の完成原稿",
  "overallComment": "総評"
}
"#;

const SCHEMA_WITHOUT_SOURCE: &str = r#"
【出力形式】
必ずJSON形式で回答してください。JSON以外のテキストを含めないでください。
{
  "results": [
    {
      "item": "項目名",
      "originalContent": "制作物上の記載",
      "factCheckResult": "事実照合結果",
      "judgment": "PASS" | "WARNING" | "FAIL",
      "suggestion": "修正案"
    }
  ],
  "revisedAdCopy": "修正後の原稿",
  "overallComment": "総評"
}
"#;

const STANDARD_USER_TEMPLATE: &str = "
【検証対象テキスト】
{ad_text}

【物件原本データ（Excel）】
{evidence_text}

上記データと添付のデザイン案を照合してください。
特に、Google検索とGoogle Mapsを使用して、周辺店舗の存続状況や駅までの距離を厳格にファクトチェックしてください。
";

const QUICK_USER_TEMPLATE: &str = "
【広告案】
{ad_text}

【物件データ】
{evidence_text}

上記を照合し、規約違反の可能性がある箇所を指摘してください。
";
