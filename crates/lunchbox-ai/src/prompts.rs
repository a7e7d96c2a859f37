// ── Prompt templates ──
// Every prompt demands bare JSON; replies are still fence-stripped in `parse`.

pub(crate) const ANALYZE_PROMPT: &str = "\
You are a food freshness expert. Identify the grocery or produce item in this photo \
and judge its freshness from visual cues such as colour, texture, spots and bruising.

Respond ONLY with a JSON object. No markdown fences, no explanation:
{
  \"item_name\": \"name of the item\",
  \"category\": \"fruit|vegetable|meat|seafood|dairy|grain|pantry|beverage|other\",
  \"freshness_score\": 7,
  \"freshness_description\": \"one or two sentences\",
  \"estimated_days_remaining\": 5,
  \"storage_tips\": [\"tip\", \"tip\"],
  \"visual_indicators\": [\"what you observed\"],
  \"sustainable_alternative\": {
    \"name\": \"lower-impact alternative\",
    \"reason\": \"why it is more sustainable\",
    \"carbon_savings_percent\": 30
  }
}

freshness_score is an integer from 1 (inedible) to 10 (perfectly fresh).
estimated_days_remaining is the number of days until the item should not be eaten.";

pub(crate) const LIVE_PROMPT: &str = "\
Detect fresh produce (fruits and vegetables only) in this photo. Ignore packaged food, \
drinks, containers and utensils. Report at most 5 items.

Respond ONLY with a JSON object. No markdown fences, no explanation:
{
  \"detections\": [
    {
      \"item_name\": \"Banana\",
      \"category\": \"fruit\",
      \"freshness_score\": 8,
      \"freshness_description\": \"under ten words\",
      \"estimated_days_remaining\": 4,
      \"box\": [200, 300, 600, 700]
    }
  ]
}

box is [y_min, x_min, y_max, x_max], each normalised to 0-1000, tightly around one item.
freshness_score is an integer from 1 to 10. If there is no produce return {\"detections\": []}.";

pub(crate) const RECIPES_SYSTEM_PROMPT: &str =
    "You are a sustainable cooking expert. Always respond with valid JSON only.";

pub(crate) fn recipes_prompt(items: &[String]) -> String {
    format!(
        "Suggest 3 recipes that use up these items before they expire: {items}.\n\
         Minimise food waste.\n\
         \n\
         Respond ONLY with a JSON array. No markdown fences, no explanation:\n\
         [{{\"title\": \"...\", \"description\": \"...\", \"ingredients\": [\"with amounts\"], \
         \"steps\": [\"...\"], \"carbon_savings\": \"CO2 saved by not wasting the items\", \
         \"prep_time\": \"20 minutes\"}}]",
        items = items.join(", "),
    )
}
